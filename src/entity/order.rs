use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, take_opt_string, take_string, unknown};
use crate::{
    error::{AppError, AppResult},
    field::{FieldDef, FieldKind, FieldValue},
};

pub const STATUSES: &[&str] = &["pending", "payment_failed", "coming", "completed"];

/// Lifecycle of an order. One enumeration replaces the separate
/// status string and paid flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Persisted, payment not captured yet.
    #[serde(rename = "pending")]
    Created,
    #[serde(rename = "payment_failed")]
    PaymentFailed,
    /// Charge captured, awaiting delivery.
    #[serde(rename = "coming")]
    Paid,
    #[serde(rename = "completed")]
    Fulfilled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "pending",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::Paid => "coming",
            OrderStatus::Fulfilled => "completed",
        }
    }

    pub fn is_paid(self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Fulfilled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Created, OrderStatus::Paid)
                | (OrderStatus::Created, OrderStatus::PaymentFailed)
                | (OrderStatus::PaymentFailed, OrderStatus::Paid)
                | (OrderStatus::Paid, OrderStatus::Fulfilled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Created),
            "payment_failed" => Ok(OrderStatus::PaymentFailed),
            "coming" => Ok(OrderStatus::Paid),
            "completed" => Ok(OrderStatus::Fulfilled),
            other => Err(AppError::BadRequest(format!("Unknown order status {other}"))),
        }
    }
}

impl From<OrderStatus> for FieldValue {
    fn from(value: OrderStatus) -> Self {
        FieldValue::String(value.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Discounted unit price at the time the order was placed.
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub card_id: Uuid,
    pub products: Vec<OrderProduct>,
    pub amount: i64,
    pub currency: String,
    pub payment_id: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status.is_paid()
    }
}

// `products` is a nested list and is not addressable by name.
const SCHEMA: &[FieldDef] = &[
    FieldDef::read_only("id", FieldKind::Uuid),
    FieldDef::read_only("user_id", FieldKind::Uuid),
    FieldDef::read_only("address_id", FieldKind::Uuid),
    FieldDef::read_only("card_id", FieldKind::Uuid),
    FieldDef::read_only("amount", FieldKind::Integer),
    FieldDef::read_only("currency", FieldKind::String),
    FieldDef::nullable("payment_id", FieldKind::String),
    FieldDef::required("status", FieldKind::Enum(STATUSES)),
    FieldDef::read_only("created_at", FieldKind::DateTime),
    FieldDef::read_only("updated_at", FieldKind::DateTime),
];

impl Entity for Order {
    fn resource_name() -> &'static str {
        "Order"
    }

    fn schema() -> &'static [FieldDef] {
        SCHEMA
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        let value: FieldValue = match field {
            "id" => self.id.into(),
            "user_id" => self.user_id.into(),
            "address_id" => self.address_id.into(),
            "card_id" => self.card_id.into(),
            "amount" => self.amount.into(),
            "currency" => self.currency.clone().into(),
            "payment_id" => self.payment_id.clone().into(),
            "status" => self.status.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> AppResult<()> {
        match field {
            "payment_id" => self.payment_id = take_opt_string(field, value)?,
            "status" => self.status = take_string(field, value)?.parse()?,
            _ => return Err(unknown::<Self>(field)),
        }
        Ok(())
    }
}
