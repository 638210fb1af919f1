//! Persisted domain records

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    field::{FieldDef, FieldValue},
};

pub mod address;
pub mod card;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use address::Address;
pub use card::Card;
pub use category::Category;
pub use order::{Order, OrderProduct, OrderStatus};
pub use product::Product;
pub use user::User;

/// Capabilities every stored record shares.
///
/// `schema()` is the field registry used to validate lookups and partial
/// updates by name; `set_field` receives values already coerced to the
/// declared kind.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Singular name used in error messages (e.g. "User").
    fn resource_name() -> &'static str;

    fn schema() -> &'static [FieldDef];

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Refresh the last-update timestamp.
    fn touch(&mut self, at: DateTime<Utc>);

    fn field_value(&self, field: &str) -> Option<FieldValue>;

    fn set_field(&mut self, field: &str, value: FieldValue) -> AppResult<()>;

    fn field_def(field: &str) -> AppResult<&'static FieldDef> {
        Self::schema()
            .iter()
            .find(|def| def.name == field)
            .ok_or_else(|| AppError::UnknownField {
                entity: Self::resource_name(),
                field: field.to_string(),
            })
    }
}

// Typed extraction used by the `set_field` implementations. The repository
// coerces values before they get here, so a miss is a registry bug.

pub(crate) fn take_string(field: &str, value: FieldValue) -> AppResult<String> {
    match value {
        FieldValue::String(s) => Ok(s),
        other => Err(mismatch(field, "string", &other)),
    }
}

pub(crate) fn take_opt_string(field: &str, value: FieldValue) -> AppResult<Option<String>> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::String(s) => Ok(Some(s)),
        other => Err(mismatch(field, "string or null", &other)),
    }
}

pub(crate) fn take_i64(field: &str, value: FieldValue) -> AppResult<i64> {
    value
        .as_integer()
        .ok_or_else(|| mismatch(field, "integer", &value))
}

pub(crate) fn take_bool(field: &str, value: FieldValue) -> AppResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| mismatch(field, "boolean", &value))
}

pub(crate) fn take_uuid(field: &str, value: FieldValue) -> AppResult<Uuid> {
    value.as_uuid().ok_or_else(|| mismatch(field, "uuid", &value))
}

fn mismatch(field: &str, expected: &str, found: &FieldValue) -> AppError {
    AppError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.type_name(),
    }
}

pub(crate) fn unknown<T: Entity>(field: &str) -> AppError {
    AppError::UnknownField {
        entity: T::resource_name(),
        field: field.to_string(),
    }
}
