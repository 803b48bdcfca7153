use json::JsonValue;
use tracing::{debug, info};

use crate::data::UserID;

use super::{
    is_legal_key, DocumentStore, StoreError, ENTRY_SEPARATOR, MAX_CTF_ENTRIES, PATH_TO_CTF_NAMES,
    PATH_TO_USER_DATA, UID_PLACEHOLDER,
};

/// Reads and writes a user's profile record without exposing store paths.
pub struct ProfileClient<S> {
    store: S,
}

impl<S: DocumentStore> ProfileClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn path_to_ctf_names(uid: &UserID) -> Result<String, StoreError> {
        legal_uid(uid).map(|uid| PATH_TO_CTF_NAMES.replace(UID_PLACEHOLDER, uid))
    }

    fn path_to_user_data(uid: &UserID) -> Result<String, StoreError> {
        legal_uid(uid).map(|uid| PATH_TO_USER_DATA.replace(UID_PLACEHOLDER, uid))
    }

    /// The user's CTF names in stored order, at most [`MAX_CTF_ENTRIES`] of them.
    /// Empty when nothing has been saved yet.
    pub async fn get_names(&self, uid: &UserID) -> Result<Vec<String>, StoreError> {
        let path = Self::path_to_ctf_names(uid)?;
        let stored = self.store.read(&path).await?;
        let mut names = match stored {
            None => vec![],
            Some(value) => split_names(value.as_str().ok_or(StoreError::Corrupt(path))?),
        };
        names.truncate(MAX_CTF_ENTRIES);
        Ok(names)
    }

    /// Overwrites the stored list. Nothing is merged with what was there before.
    pub async fn set_names(&self, uid: &UserID, names: &[String]) -> Result<(), StoreError> {
        let path = Self::path_to_ctf_names(uid)?;
        debug!("saving {} CTF names for {}", names.len(), uid.0);
        self.store.write(&path, JsonValue::from(names.join(ENTRY_SEPARATOR))).await
    }

    /// Removes the whole profile record. Succeeds if there is none.
    pub async fn delete_profile(&self, uid: &UserID) -> Result<(), StoreError> {
        let path = Self::path_to_user_data(uid)?;
        self.store.remove(&path).await?;
        info!("deleted profile record of {}", uid.0);
        Ok(())
    }
}

fn legal_uid(uid: &UserID) -> Result<&str, StoreError> {
    if is_legal_key(&uid.0) {
        Ok(uid.0.as_str())
    } else {
        Err(StoreError::InvalidKey(uid.0.clone()))
    }
}

fn split_names(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        vec![]
    } else {
        stored.split(ENTRY_SEPARATOR).map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory::StoreOp, MemoryStore};

    fn uid() -> UserID {
        UserID("u1".to_string())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|x| x.to_string()).collect()
    }

    #[actix_web::test]
    async fn nothing_stored_reads_as_empty() {
        let profiles = ProfileClient::new(MemoryStore::new());
        assert!(profiles.get_names(&uid()).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn splits_stored_value_on_separator() {
        let profiles = ProfileClient::new(MemoryStore::new());
        profiles.store().write("data/u1/ctf_names", "DEF CON␞PlaidCTF".into()).await.unwrap();
        assert_eq!(profiles.get_names(&uid()).await.unwrap(), names(&["DEF CON", "PlaidCTF"]));
    }

    #[actix_web::test]
    async fn set_then_get_keeps_order() {
        let profiles = ProfileClient::new(MemoryStore::new());
        let list = names(&["HITCON", "DEF CON", "0CTF"]);
        profiles.set_names(&uid(), &list).await.unwrap();
        assert_eq!(profiles.get_names(&uid()).await.unwrap(), list);

        profiles.set_names(&uid(), &[]).await.unwrap();
        assert!(profiles.get_names(&uid()).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn truncates_to_max_entries() {
        let profiles = ProfileClient::new(MemoryStore::new());
        let stored = (0..15).map(|i| format!("ctf{i}")).collect::<Vec<_>>().join(ENTRY_SEPARATOR);
        profiles.store().write("data/u1/ctf_names", stored.into()).await.unwrap();
        let read = profiles.get_names(&uid()).await.unwrap();
        assert_eq!(read.len(), MAX_CTF_ENTRIES);
        assert_eq!(read[0], "ctf0");
    }

    #[actix_web::test]
    async fn rejects_illegal_user_ids_before_calling_the_store() {
        let profiles = ProfileClient::new(MemoryStore::new());
        let bad = UserID("a/b".to_string());
        assert!(matches!(profiles.get_names(&bad).await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(profiles.delete_profile(&bad).await, Err(StoreError::InvalidKey(_))));
        assert!(profiles.store().calls().is_empty());
    }

    #[actix_web::test]
    async fn store_errors_propagate_unmodified() {
        let profiles = ProfileClient::new(MemoryStore::new());
        let error = StoreError::Rejected("permission denied".to_string());
        profiles.store().fail_next(StoreOp::Write, error.clone());
        assert_eq!(profiles.set_names(&uid(), &names(&["a"])).await, Err(error));
    }

    #[actix_web::test]
    async fn delete_profile_tolerates_missing_record() {
        let profiles = ProfileClient::new(MemoryStore::new());
        profiles.set_names(&uid(), &names(&["a"])).await.unwrap();
        profiles.delete_profile(&uid()).await.unwrap();
        assert!(profiles.get_names(&uid()).await.unwrap().is_empty());
        profiles.delete_profile(&uid()).await.unwrap();
    }
}
