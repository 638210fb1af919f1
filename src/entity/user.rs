use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, take_bool, take_opt_string, take_string, unknown};
use crate::{
    error::AppResult,
    field::{FieldDef, FieldKind, FieldValue},
};

pub const ROLES: &[&str] = &["user", "admin"];
pub const PROVIDERS: &[&str] = &["local", "google", "facebook", "github"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 hash while stored; always empty on values handed back to callers.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub email_verified: bool,
    pub provider: String,
    /// Payment-provider customer reference, created on first use.
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Copy safe to return: no password hash.
    pub fn redacted(mut self) -> Self {
        self.password.clear();
        self
    }
}

const SCHEMA: &[FieldDef] = &[
    FieldDef::read_only("id", FieldKind::Uuid),
    FieldDef::required("email", FieldKind::String),
    FieldDef::required("password", FieldKind::String),
    FieldDef::required("first_name", FieldKind::String),
    FieldDef::required("last_name", FieldKind::String),
    FieldDef::nullable("phone", FieldKind::String),
    FieldDef::required("role", FieldKind::Enum(ROLES)),
    FieldDef::required("email_verified", FieldKind::Boolean),
    FieldDef::required("provider", FieldKind::Enum(PROVIDERS)),
    FieldDef::nullable("customer_id", FieldKind::String),
    FieldDef::read_only("created_at", FieldKind::DateTime),
    FieldDef::read_only("updated_at", FieldKind::DateTime),
];

impl Entity for User {
    fn resource_name() -> &'static str {
        "User"
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
            "email" => self.email.clone().into(),
            "password" => self.password.clone().into(),
            "first_name" => self.first_name.clone().into(),
            "last_name" => self.last_name.clone().into(),
            "phone" => self.phone.clone().into(),
            "role" => self.role.clone().into(),
            "email_verified" => self.email_verified.into(),
            "provider" => self.provider.clone().into(),
            "customer_id" => self.customer_id.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, field: &str, value: FieldValue) -> AppResult<()> {
        match field {
            "email" => self.email = take_string(field, value)?,
            "password" => self.password = take_string(field, value)?,
            "first_name" => self.first_name = take_string(field, value)?,
            "last_name" => self.last_name = take_string(field, value)?,
            "phone" => self.phone = take_opt_string(field, value)?,
            "role" => self.role = take_string(field, value)?,
            "email_verified" => self.email_verified = take_bool(field, value)?,
            "provider" => self.provider = take_string(field, value)?,
            "customer_id" => self.customer_id = take_opt_string(field, value)?,
            _ => return Err(unknown::<Self>(field)),
        }
        Ok(())
    }
}
