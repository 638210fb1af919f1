use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, take_bool, take_i64, take_opt_string, take_string, take_uuid, unknown};
use crate::{
    error::AppResult,
    field::{FieldDef, FieldKind, FieldValue},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in minor currency units.
    pub price: i64,
    /// Percentage off the unit price, 0..=100.
    pub discount_rate: i64,
    pub stock: i64,
    pub available: bool,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price after the discount, rounded down to the minor unit.
    /// `None` if the result does not fit in an `i64`.
    pub fn discounted_price(&self) -> Option<i64> {
        self.line_total(1)
    }

    /// Price of `quantity` units after the discount, or `None` on overflow.
    pub fn line_total(&self, quantity: i64) -> Option<i64> {
        let rate = i128::from(self.discount_rate.clamp(0, 100));
        let total = i128::from(self.price)
            .checked_mul(100 - rate)?
            .checked_mul(i128::from(quantity))?
            / 100;
        i64::try_from(total).ok()
    }

    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.available && quantity > 0 && self.stock >= quantity
    }
}

const SCHEMA: &[FieldDef] = &[
    FieldDef::read_only("id", FieldKind::Uuid),
    FieldDef::required("name", FieldKind::String),
    FieldDef::nullable("description", FieldKind::String),
    FieldDef::required("price", FieldKind::Integer),
    FieldDef::required("discount_rate", FieldKind::Integer),
    FieldDef::required("stock", FieldKind::Integer),
    FieldDef::required("available", FieldKind::Boolean),
    FieldDef::required("category_id", FieldKind::Uuid),
    FieldDef::read_only("created_at", FieldKind::DateTime),
    FieldDef::read_only("updated_at", FieldKind::DateTime),
];

impl Entity for Product {
    fn resource_name() -> &'static str {
        "Product"
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
            "name" => self.name.clone().into(),
            "description" => self.description.clone().into(),
            "price" => self.price.into(),
            "discount_rate" => self.discount_rate.into(),
            "stock" => self.stock.into(),
            "available" => self.available.into(),
            "category_id" => self.category_id.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> AppResult<()> {
        match field {
            "name" => self.name = take_string(field, value)?,
            "description" => self.description = take_opt_string(field, value)?,
            "price" => self.price = take_i64(field, value)?,
            "discount_rate" => self.discount_rate = take_i64(field, value)?,
            "stock" => self.stock = take_i64(field, value)?,
            "available" => self.available = take_bool(field, value)?,
            "category_id" => self.category_id = take_uuid(field, value)?,
            _ => return Err(unknown::<Self>(field)),
        }
        Ok(())
    }
}
