use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, take_opt_string, take_string, unknown};
use crate::{
    error::AppResult,
    field::{FieldDef, FieldKind, FieldValue},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SCHEMA: &[FieldDef] = &[
    FieldDef::read_only("id", FieldKind::Uuid),
    FieldDef::read_only("user_id", FieldKind::Uuid),
    FieldDef::required("title", FieldKind::String),
    FieldDef::required("line1", FieldKind::String),
    FieldDef::nullable("line2", FieldKind::String),
    FieldDef::required("city", FieldKind::String),
    FieldDef::required("postal_code", FieldKind::String),
    FieldDef::required("country", FieldKind::String),
    FieldDef::nullable("phone", FieldKind::String),
    FieldDef::read_only("created_at", FieldKind::DateTime),
    FieldDef::read_only("updated_at", FieldKind::DateTime),
];

impl Entity for Address {
    fn resource_name() -> &'static str {
        "Address"
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
            "title" => self.title.clone().into(),
            "line1" => self.line1.clone().into(),
            "line2" => self.line2.clone().into(),
            "city" => self.city.clone().into(),
            "postal_code" => self.postal_code.clone().into(),
            "country" => self.country.clone().into(),
            "phone" => self.phone.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> AppResult<()> {
        match field {
            "title" => self.title = take_string(field, value)?,
            "line1" => self.line1 = take_string(field, value)?,
            "line2" => self.line2 = take_opt_string(field, value)?,
            "city" => self.city = take_string(field, value)?,
            "postal_code" => self.postal_code = take_string(field, value)?,
            "country" => self.country = take_string(field, value)?,
            "phone" => self.phone = take_opt_string(field, value)?,
            _ => return Err(unknown::<Self>(field)),
        }
        Ok(())
    }
}
