use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, take_i64, unknown};
use crate::{
    error::AppResult,
    field::{FieldDef, FieldKind, FieldValue},
};

/// A saved payment method. Card data itself lives with the payment provider;
/// only its reference and display details are kept here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: String,
    pub brand: String,
    pub last4: String,
    pub exp_month: i64,
    pub exp_year: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SCHEMA: &[FieldDef] = &[
    FieldDef::read_only("id", FieldKind::Uuid),
    FieldDef::read_only("user_id", FieldKind::Uuid),
    FieldDef::read_only("payment_method_id", FieldKind::String),
    FieldDef::read_only("brand", FieldKind::String),
    FieldDef::read_only("last4", FieldKind::String),
    FieldDef::required("exp_month", FieldKind::Integer),
    FieldDef::required("exp_year", FieldKind::Integer),
    FieldDef::read_only("created_at", FieldKind::DateTime),
    FieldDef::read_only("updated_at", FieldKind::DateTime),
];

impl Entity for Card {
    fn resource_name() -> &'static str {
        "Card"
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
            "payment_method_id" => self.payment_method_id.clone().into(),
            "brand" => self.brand.clone().into(),
            "last4" => self.last4.clone().into(),
            "exp_month" => self.exp_month.into(),
            "exp_year" => self.exp_year.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> AppResult<()> {
        match field {
            "exp_month" => self.exp_month = take_i64(field, value)?,
            "exp_year" => self.exp_year = take_i64(field, value)?,
            _ => return Err(unknown::<Self>(field)),
        }
        Ok(())
    }
}
