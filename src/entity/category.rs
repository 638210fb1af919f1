use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, take_opt_string, take_string, unknown};
use crate::{
    error::AppResult,
    field::{FieldDef, FieldKind, FieldValue},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SCHEMA: &[FieldDef] = &[
    FieldDef::read_only("id", FieldKind::Uuid),
    FieldDef::required("name", FieldKind::String),
    FieldDef::nullable("description", FieldKind::String),
    FieldDef::read_only("created_at", FieldKind::DateTime),
    FieldDef::read_only("updated_at", FieldKind::DateTime),
];

impl Entity for Category {
    fn resource_name() -> &'static str {
        "Category"
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
            _ => return Err(unknown::<Self>(field)),
        }
        Ok(())
    }
}
