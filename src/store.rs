//! In-memory record store keyed by entity id

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use anyhow::anyhow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Thread-safe map from id to record.
///
/// Reads share the lock; `set`, `update`, `modify` and `remove` hold it
/// exclusively for their whole duration.
pub struct DataStore<T> {
    name: &'static str,
    records: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for DataStore<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            records: Arc::clone(&self.records),
        }
    }
}

impl<T: Clone> DataStore<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn set(&self, id: Uuid, value: T) -> AppResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire write lock: {}", e)))?;

        if records.contains_key(&id) {
            return Err(AppError::AlreadyExists(id));
        }
        records.insert(id, value);
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> AppResult<T> {
        let records = self
            .records
            .read()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire read lock: {}", e)))?;

        records.get(id).cloned().ok_or(AppError::NotFound(self.name))
    }

    pub fn get_all(&self) -> AppResult<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire read lock: {}", e)))?;

        Ok(records.values().cloned().collect())
    }

    pub fn update(&self, id: &Uuid, value: T) -> AppResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire write lock: {}", e)))?;

        let slot = records.get_mut(id).ok_or(AppError::NotFound(self.name))?;
        *slot = value;
        Ok(())
    }

    /// Apply `change` to a copy of the record and commit it only if `change`
    /// succeeds. Readers see either the old or the new record, never a mix.
    pub fn modify<F>(&self, id: &Uuid, change: F) -> AppResult<T>
    where
        F: FnOnce(&mut T) -> AppResult<()>,
    {
        let mut records = self
            .records
            .write()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire write lock: {}", e)))?;

        let slot = records.get_mut(id).ok_or(AppError::NotFound(self.name))?;
        let mut draft = slot.clone();
        change(&mut draft)?;
        *slot = draft.clone();
        Ok(draft)
    }

    pub fn remove(&self, id: &Uuid) -> AppResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire write lock: {}", e)))?;

        records
            .remove(id)
            .map(|_| ())
            .ok_or(AppError::NotFound(self.name))
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.records
            .read()
            .map(|records| records.contains_key(id))
            .unwrap_or(false)
    }

    pub fn filter<P>(&self, predicate: P) -> AppResult<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        let records = self
            .records
            .read()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire read lock: {}", e)))?;

        Ok(records.values().filter(|r| predicate(r)).cloned().collect())
    }

    pub fn find_first<P>(&self, predicate: P) -> AppResult<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        let records = self
            .records
            .read()
            .map_err(|e| AppError::Internal(anyhow!("Failed to acquire read lock: {}", e)))?;

        Ok(records.values().find(|r| predicate(r)).cloned())
    }
}
