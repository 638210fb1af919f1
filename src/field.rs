//! Dynamically typed field values and the per-entity field registry

use std::{cmp::Ordering, collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A polymorphic field value as it arrives from a partial-update payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Null => "null",
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Ordering between two values of compatible types. Integers and floats
    /// compare numerically; anything else across types is unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::*;
        match (self, other) {
            (String(a), String(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Null, Null) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Declared type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Uuid,
    DateTime,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Uuid => write!(f, "uuid"),
            FieldKind::DateTime => write!(f, "datetime"),
            FieldKind::Enum(values) => write!(f, "one of [{}]", values.join(", ")),
        }
    }
}

/// One entry of an entity's field registry.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Searchable but never written through a partial update.
    pub read_only: bool,
}

impl FieldDef {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            read_only: false,
        }
    }

    pub const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            read_only: false,
        }
    }

    pub const fn read_only(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            read_only: true,
        }
    }

    /// Normalize `value` to this field's declared type.
    ///
    /// JSON carries uuids and timestamps as strings, so those are parsed here;
    /// nothing else is converted.
    pub fn coerce(&self, value: FieldValue) -> AppResult<FieldValue> {
        let coerced = match (self.kind, value) {
            (_, FieldValue::Null) if self.nullable => Some(FieldValue::Null),
            (FieldKind::String, v @ FieldValue::String(_)) => Some(v),
            (FieldKind::Integer, v @ FieldValue::Integer(_)) => Some(v),
            (FieldKind::Float, v @ FieldValue::Float(_)) => Some(v),
            (FieldKind::Float, FieldValue::Integer(i)) => Some(FieldValue::Float(i as f64)),
            (FieldKind::Boolean, v @ FieldValue::Boolean(_)) => Some(v),
            (FieldKind::Uuid, v @ FieldValue::Uuid(_)) => Some(v),
            (FieldKind::Uuid, FieldValue::String(s)) => {
                Uuid::parse_str(&s).ok().map(FieldValue::Uuid)
            }
            (FieldKind::DateTime, v @ FieldValue::DateTime(_)) => Some(v),
            (FieldKind::DateTime, FieldValue::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| FieldValue::DateTime(dt.with_timezone(&Utc))),
            (FieldKind::Enum(allowed), FieldValue::String(s)) => {
                if allowed.contains(&s.as_str()) {
                    Some(FieldValue::String(s))
                } else {
                    None
                }
            }
            (_, other) => {
                return Err(self.mismatch(other.type_name()));
            }
        };

        coerced.ok_or_else(|| self.mismatch("string"))
    }

    pub fn mismatch(&self, found: &'static str) -> AppError {
        AppError::TypeMismatch {
            field: self.name.to_string(),
            expected: if self.nullable {
                format!("{} or null", self.kind)
            } else {
                self.kind.to_string()
            },
            found,
        }
    }
}

/// Partial-update payload: field name to new value.
pub type UpdateFields = HashMap<String, FieldValue>;

/// Comparison used by `Repository::find_where`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Condition {
    pub fn matches(self, left: &FieldValue, right: &FieldValue) -> bool {
        let Some(ordering) = left.compare(right) else {
            return self == Condition::Ne;
        };
        match self {
            Condition::Eq => ordering == Ordering::Equal,
            Condition::Ne => ordering != Ordering::Equal,
            Condition::Lt => ordering == Ordering::Less,
            Condition::Le => ordering != Ordering::Greater,
            Condition::Gt => ordering == Ordering::Greater,
            Condition::Ge => ordering != Ordering::Less,
        }
    }
}

impl FromStr for Condition {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" | "=" => Ok(Condition::Eq),
            "!=" | "<>" => Ok(Condition::Ne),
            "<" => Ok(Condition::Lt),
            "<=" => Ok(Condition::Le),
            ">" => Ok(Condition::Gt),
            ">=" => Ok(Condition::Ge),
            other => Err(AppError::InvalidCondition(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: FieldDef = FieldDef::required("status", FieldKind::Enum(&["pending", "paid"]));

    #[test]
    fn coerce_accepts_declared_type() {
        let def = FieldDef::required("price", FieldKind::Integer);
        assert_eq!(def.coerce(FieldValue::Integer(10)).unwrap(), FieldValue::Integer(10));
    }

    #[test]
    fn coerce_rejects_other_types() {
        let def = FieldDef::required("price", FieldKind::Integer);
        let err = def.coerce(FieldValue::String("10".into())).unwrap_err();
        assert!(matches!(err, AppError::TypeMismatch { found: "string", .. }));

        let err = def.coerce(FieldValue::Null).unwrap_err();
        assert!(matches!(err, AppError::TypeMismatch { found: "null", .. }));
    }

    #[test]
    fn coerce_parses_uuid_strings() {
        let id = Uuid::new_v4();
        let def = FieldDef::required("category_id", FieldKind::Uuid);
        assert_eq!(
            def.coerce(FieldValue::String(id.to_string())).unwrap(),
            FieldValue::Uuid(id)
        );
        assert!(def.coerce(FieldValue::String("not-a-uuid".into())).is_err());
    }

    #[test]
    fn nullable_fields_accept_null() {
        let def = FieldDef::nullable("phone", FieldKind::String);
        assert_eq!(def.coerce(FieldValue::Null).unwrap(), FieldValue::Null);
    }

    #[test]
    fn enum_fields_only_accept_listed_values() {
        assert!(STATUS.coerce("paid".into()).is_ok());
        assert!(STATUS.coerce("shipped".into()).is_err());
    }

    #[test]
    fn conditions_parse_and_compare() {
        let le: Condition = "<=".parse().unwrap();
        assert!(le.matches(&FieldValue::Integer(3), &FieldValue::Integer(3)));
        assert!(le.matches(&FieldValue::Integer(2), &FieldValue::Float(2.5)));
        assert!(!le.matches(&FieldValue::Integer(4), &FieldValue::Integer(3)));

        assert!(matches!(
            "~=".parse::<Condition>(),
            Err(AppError::InvalidCondition(op)) if op == "~="
        ));
    }

    #[test]
    fn untagged_json_maps_onto_values() {
        let fields: UpdateFields =
            serde_json::from_str(r#"{"name":"shirt","price":120,"available":false,"phone":null}"#)
                .unwrap();
        assert_eq!(fields["name"], FieldValue::String("shirt".into()));
        assert_eq!(fields["price"], FieldValue::Integer(120));
        assert_eq!(fields["available"], FieldValue::Boolean(false));
        assert!(fields["phone"].is_null());
    }
}
