use std::{collections::HashMap, sync::{Mutex, PoisonError}};

use json::JsonValue;

use super::{check_write, parse_path, read_child, DocumentStore, RecordPath, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Write,
    Remove,
}

/// In-memory document store. Failures can be queued per operation to stand in
/// for network and permission errors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, JsonValue>>,
    failures: Mutex<HashMap<StoreOp, Vec<StoreError>>>,
    calls: Mutex<Vec<(StoreOp, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `op` fail with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
            .entry(op).or_default().push(error);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(StoreOp, String)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record_call(&self, op: StoreOp, path: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push((op, path.to_string()));
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(&op) {
            Some(queued) if !queued.is_empty() => Err(queued.remove(0)),
            _ => Ok(()),
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<JsonValue>, StoreError> {
        self.record_call(StoreOp::Read, path)?;
        let path = parse_path(path)?;
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(path.uid).and_then(|record| read_child(record, &path)))
    }

    async fn write(&self, path: &str, value: JsonValue) -> Result<(), StoreError> {
        self.record_call(StoreOp::Write, path)?;
        let path = parse_path(path)?;
        check_write(&path, &value)?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(path.uid.to_string()).or_insert_with(JsonValue::new_object);
        if let Some(key) = path.key {
            record[key] = value;
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.record_call(StoreOp::Remove, path)?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        match parse_path(path)? {
            RecordPath { uid, key: None } => {
                records.remove(uid);
            },
            RecordPath { uid, key: Some(key) } => {
                if let Some(record) = records.get_mut(uid) {
                    record.remove(key);
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn queued_failures_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.fail_next(StoreOp::Write, StoreError::Unavailable("offline".to_string()));

        let first = store.write("data/u1/ctf_names", "a".into()).await;
        assert_eq!(first, Err(StoreError::Unavailable("offline".to_string())));
        store.write("data/u1/ctf_names", "a".into()).await.unwrap();

        assert_eq!(store.read("data/u1/ctf_names").await.unwrap().unwrap().as_str(), Some("a"));
        assert_eq!(store.calls().len(), 3);
    }
}
