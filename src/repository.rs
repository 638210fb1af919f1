//! Typed, field-checked data access over [`DataStore`]

use chrono::Utc;
use uuid::Uuid;

use crate::{
    entity::Entity,
    error::{AppError, AppResult},
    field::{Condition, FieldValue, UpdateFields},
    store::DataStore,
};

/// Repository for one entity type.
///
/// Lookups and updates by field name are validated against
/// [`Entity::schema`]: unknown names fail with `UnknownField`, values that
/// cannot be the declared type fail with `TypeMismatch`.
pub struct Repository<T> {
    store: DataStore<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new() -> Self {
        Self {
            store: DataStore::new(T::resource_name()),
        }
    }

    pub fn save(&self, entity: &T) -> AppResult<()> {
        self.store.set(entity.id(), entity.clone())
    }

    pub fn find(&self) -> AppResult<Vec<T>> {
        self.store.get_all()
    }

    pub fn find_by_id(&self, id: &Uuid) -> AppResult<T> {
        self.store.get(id)
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.store.exists(id)
    }

    /// First record whose `field` equals `value`, or `None`.
    pub fn find_by_field(&self, field: &str, value: impl Into<FieldValue>) -> AppResult<Option<T>> {
        let def = T::field_def(field)?;
        let expected = def.coerce(value.into())?;

        self.store.find_first(|entity| {
            entity
                .field_value(field)
                .is_some_and(|actual| Condition::Eq.matches(&actual, &expected))
        })
    }

    /// All records where `field <condition> value` holds.
    pub fn find_where(
        &self,
        field: &str,
        condition: &str,
        value: impl Into<FieldValue>,
    ) -> AppResult<Vec<T>> {
        let def = T::field_def(field)?;
        let condition: Condition = condition.parse()?;
        let expected = def.coerce(value.into())?;

        self.store.filter(|entity| {
            entity
                .field_value(field)
                .is_some_and(|actual| condition.matches(&actual, &expected))
        })
    }

    /// Apply a partial update by field name.
    ///
    /// The whole map is validated before anything is written; the change
    /// then commits under a single write lock with a fresh `updated_at`.
    pub fn update(&self, id: &Uuid, fields: UpdateFields) -> AppResult<T> {
        self.update_if(id, fields, |_| Ok(()))
    }

    /// Like [`Repository::update`], but `precondition` is checked against the
    /// current record inside the same write lock.
    pub fn update_if<P>(&self, id: &Uuid, fields: UpdateFields, precondition: P) -> AppResult<T>
    where
        P: FnOnce(&T) -> AppResult<()>,
    {
        if fields.is_empty() {
            return Err(AppError::BadRequest("No fields to update".into()));
        }

        let mut changes = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let def = T::field_def(&name)?;
            if def.read_only {
                return Err(AppError::BadRequest(format!("Field `{name}` is read-only")));
            }
            let value = def.coerce(value)?;
            changes.push((name, value));
        }

        self.store.modify(id, |entity| {
            precondition(entity)?;
            for (name, value) in changes {
                entity.set_field(&name, value)?;
            }
            let now = Utc::now();
            let stamp = if now > entity.updated_at() {
                now
            } else {
                entity.updated_at() + chrono::Duration::microseconds(1)
            };
            entity.touch(stamp);
            Ok(())
        })
    }

    pub fn remove(&self, id: &Uuid) -> AppResult<()> {
        self.store.remove(id)
    }
}
