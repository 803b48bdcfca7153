use std::{fs::{create_dir_all, read_to_string, remove_file}, io::ErrorKind, path::{Path, PathBuf}};

use json::JsonValue;
use tracing::debug;

use super::{check_write, parse_path, read_child, DocumentStore, RecordPath, StoreError, DATA_ROOT};

/// Document store keeping one JSON file per user record under `<root>/data`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn record_file(&self, uid: &str) -> PathBuf {
        self.root.join(DATA_ROOT).join(uid.to_string() + ".json")
    }

    fn load_record(&self, uid: &str) -> Result<Option<JsonValue>, StoreError> {
        let file = self.record_file(uid);
        match read_to_string(&file) {
            Ok(text) => json::parse(&text)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(file.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn store_record(&self, uid: &str, record: &JsonValue) -> Result<(), StoreError> {
        create_dir_all(self.root.join(DATA_ROOT)).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        std::fs::write(self.record_file(uid), record.dump())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl DocumentStore for FileStore {
    async fn read(&self, path: &str) -> Result<Option<JsonValue>, StoreError> {
        let path = parse_path(path)?;
        Ok(self.load_record(path.uid)?.and_then(|record| read_child(&record, &path)))
    }

    async fn write(&self, path: &str, value: JsonValue) -> Result<(), StoreError> {
        let path = parse_path(path)?;
        check_write(&path, &value)?;
        let mut record = self.load_record(path.uid)?.unwrap_or_else(JsonValue::new_object);
        if let Some(key) = path.key {
            record[key] = value;
        }
        debug!("writing record {}", path.uid);
        self.store_record(path.uid, &record)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        match parse_path(path)? {
            RecordPath { uid, key: None } => match remove_file(self.record_file(uid)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::Unavailable(e.to_string())),
            },
            RecordPath { uid, key: Some(key) } => match self.load_record(uid)? {
                Some(mut record) => {
                    record.remove(key);
                    self.store_record(uid, &record)
                },
                None => Ok(()),
            },
        }
    }
}
