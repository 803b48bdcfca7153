use std::{collections::HashMap, fs::{create_dir_all, read_dir, read_to_string, remove_file}, io::ErrorKind, path::{Path, PathBuf}, sync::{Mutex, MutexGuard, OnceLock, PoisonError}};

use chrono::{Duration, Local, NaiveDateTime};
use json::object;
use tracing::{info, warn};
use rand::distributions::{Alphanumeric, DistString};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::data::{User, UserID};

use super::{AuthError, Credential, IdentityService, SessionID, MIN_PASSWORD_LEN};

const AUTH_DIR: &str = "auth";
const USER_ID_LEN: usize = 28;
const SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStore {
    pub salt: String,
    pub hashed: String,
}

impl PasswordStore {
    fn secure(password: &str) -> Self {
        let salt = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
        let hashed = hash_password(password, &salt);
        Self { salt, hashed }
    }

    fn matches(&self, password: &str) -> bool {
        hash_password(password, &self.salt) == self.hashed
    }
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.to_string() + salt);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
struct Account {
    email: String,
    password: PasswordStore,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid e-mail pattern"))
}

/// E-mail/password identity provider. Accounts are persisted as one JSON file
/// each under `<root>/auth` when a root is given; sessions live in memory.
pub struct LocalIdentity {
    root: Option<PathBuf>,
    accounts: Mutex<HashMap<UserID, Account>>,
    sessions: Mutex<HashMap<SessionID, (UserID, NaiveDateTime)>>,
    session_lifetime: Duration,
}

impl LocalIdentity {
    pub fn in_memory() -> Self {
        Self {
            root: None,
            accounts: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            session_lifetime: Duration::days(30),
        }
    }

    /// Loads every account stored under `root`. Unreadable account files are
    /// skipped with a warning.
    pub fn load(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let accounts = load_accounts(&root.join(AUTH_DIR));
        info!("loaded {} accounts", accounts.len());
        Self {
            root: Some(root),
            accounts: Mutex::new(accounts),
            ..Self::in_memory()
        }
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<UserID, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionID, (UserID, NaiveDateTime)>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find_by_email(&self, email: &str) -> Option<(UserID, Account)> {
        find_by_email(&self.accounts(), email).map(|(id, account)| (id.clone(), account.clone()))
    }

    /// Starts a session for `user`. Expired sessions are dropped on the way.
    fn create_session(&self, user: &UserID) -> SessionID {
        let mut sessions = self.sessions();
        let now = Local::now().naive_local();
        sessions.retain(|_, (_, last_use)| now.signed_duration_since(*last_use) <= self.session_lifetime);
        let session_id = loop {
            let id = SessionID(Alphanumeric.sample_string(&mut rand::thread_rng(), SESSION_ID_LEN));
            if !sessions.contains_key(&id) {
                break id;
            }
        };
        sessions.insert(session_id.clone(), (user.clone(), now));
        session_id
    }

    fn account_file(&self, id: &UserID) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(AUTH_DIR).join(id.0.clone() + ".json"))
    }

    fn store_account(&self, id: &UserID, account: &Account) -> Result<(), AuthError> {
        let Some(file) = self.account_file(id) else {
            return Ok(());
        };
        if let Some(dir) = file.parent() {
            create_dir_all(dir).map_err(|e| AuthError::Unavailable(e.to_string()))?;
        }
        let json = object! {
            email: account.email.as_str(),
            salt: account.password.salt.as_str(),
            hashed: account.password.hashed.as_str(),
        };
        std::fs::write(file, json.dump()).map_err(|e| AuthError::Unavailable(e.to_string()))
    }

    fn delete_account_file(&self, id: &UserID) -> Result<(), AuthError> {
        match self.account_file(id).map(remove_file) {
            None | Some(Ok(())) => Ok(()),
            Some(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
            Some(Err(e)) => Err(AuthError::Unavailable(e.to_string())),
        }
    }

    fn user(id: &UserID, account: &Account) -> User {
        User { id: id.clone(), email: account.email.clone() }
    }
}

fn find_by_email<'a>(accounts: &'a HashMap<UserID, Account>, email: &str) -> Option<(&'a UserID, &'a Account)> {
    accounts.iter().find(|(_, account)| account.email.eq_ignore_ascii_case(email))
}

fn load_accounts(dir: &Path) -> HashMap<UserID, Account> {
    let Ok(entries) = read_dir(dir) else {
        return HashMap::new();
    };
    entries.filter_map(Result::ok).filter_map(|file| {
        let path = file.path();
        let id = UserID(path.file_stem()?.to_str()?.to_string());
        let account = read_to_string(&path).ok()
            .and_then(|text| json::parse(&text).ok())
            .and_then(|json| Some(Account {
                email: json["email"].as_str()?.to_string(),
                password: PasswordStore {
                    salt: json["salt"].as_str()?.to_string(),
                    hashed: json["hashed"].as_str()?.to_string(),
                },
            }));
        match account {
            Some(account) if id.is_valid() => Some((id, account)),
            _ => {
                warn!("skipping unreadable account file {}", path.display());
                None
            },
        }
    }).collect()
}

impl IdentityService for LocalIdentity {
    fn user_for_session(&self, session: &SessionID) -> Option<User> {
        let now = Local::now().naive_local();
        let user_id = {
            let mut sessions = self.sessions();
            let (user_id, last_use) = sessions.get_mut(session)?;
            if now.signed_duration_since(*last_use) > self.session_lifetime {
                sessions.remove(session);
                return None;
            }
            *last_use = now;
            user_id.clone()
        };
        self.accounts().get(&user_id).map(|account| Self::user(&user_id, account))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(User, SessionID), AuthError> {
        let email = email.trim();
        if !email_pattern().is_match(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let password = PasswordStore::secure(password);
        let (id, account) = {
            let mut accounts = self.accounts();
            if find_by_email(&accounts, email).is_some() {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let id = loop {
                let id = UserID(Alphanumeric.sample_string(&mut rand::thread_rng(), USER_ID_LEN));
                if !accounts.contains_key(&id) {
                    break id;
                }
            };
            let account = Account { email: email.to_string(), password };
            self.store_account(&id, &account)?;
            accounts.insert(id.clone(), account.clone());
            (id, account)
        };
        info!("signed up {}", id.0);
        let session = self.create_session(&id);
        Ok((Self::user(&id, &account), session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(User, SessionID), AuthError> {
        let email = email.trim();
        if !email_pattern().is_match(email) {
            return Err(AuthError::InvalidEmail);
        }
        let (id, account) = self.find_by_email(email).ok_or(AuthError::UserNotFound)?;
        if !account.password.matches(password) {
            return Err(AuthError::WrongPassword);
        }
        info!("signed in {}", id.0);
        let session = self.create_session(&id);
        Ok((Self::user(&id, &account), session))
    }

    async fn sign_out(&self, session: &SessionID) -> Result<(), AuthError> {
        if let Some((user, _)) = self.sessions().remove(session) {
            info!("signed out {}", user.0);
        }
        Ok(())
    }

    async fn reauthenticate(&self, user: &User, credential: &Credential) -> Result<(), AuthError> {
        let account = self.accounts().get(&user.id).cloned().ok_or(AuthError::UserNotFound)?;
        if !account.email.eq_ignore_ascii_case(credential.email.trim()) {
            return Err(AuthError::UserNotFound);
        }
        if !account.password.matches(&credential.password) {
            return Err(AuthError::WrongPassword);
        }
        Ok(())
    }

    async fn update_password(&self, user: &User, new_password: &str) -> Result<(), AuthError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let password = PasswordStore::secure(new_password);
        let mut accounts = self.accounts();
        let mut account = accounts.get(&user.id).cloned().ok_or(AuthError::UserNotFound)?;
        account.password = password;
        self.store_account(&user.id, &account)?;
        accounts.insert(user.id.clone(), account);
        drop(accounts);
        info!("updated password of {}", user.id.0);
        Ok(())
    }

    async fn delete(&self, user: &User) -> Result<(), AuthError> {
        let mut accounts = self.accounts();
        if !accounts.contains_key(&user.id) {
            return Err(AuthError::UserNotFound);
        }
        self.delete_account_file(&user.id)?;
        accounts.remove(&user.id);
        drop(accounts);
        self.sessions().retain(|_, (id, _)| id != &user.id);
        info!("deleted identity {}", user.id.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use actix_web::rt::System;

    use super::*;

    #[actix_web::test]
    async fn sign_up_then_sign_in() {
        let identity = LocalIdentity::in_memory();
        let (user, session) = identity.sign_up("player@ctf.org", "hunter22").await.unwrap();
        assert!(user.id.is_valid());
        assert_eq!(user.id.0.len(), USER_ID_LEN);
        assert_eq!(identity.user_for_session(&session), Some(user.clone()));

        let (again, _) = identity.sign_in("Player@CTF.org", "hunter22").await.unwrap();
        assert_eq!(again, user);
        assert_eq!(identity.sign_in("player@ctf.org", "nope").await, Err(AuthError::WrongPassword));
        assert_eq!(identity.sign_in("nobody@ctf.org", "hunter22").await, Err(AuthError::UserNotFound));
    }

    #[actix_web::test]
    async fn sign_up_validates_input() {
        let identity = LocalIdentity::in_memory();
        assert_eq!(identity.sign_up("not-an-email", "hunter22").await, Err(AuthError::InvalidEmail));
        assert_eq!(identity.sign_up("a@b.co", "12345").await, Err(AuthError::WeakPassword));
        identity.sign_up("a@b.co", "123456").await.unwrap();
        assert_eq!(identity.sign_up("A@B.co", "123456").await, Err(AuthError::EmailAlreadyInUse));
    }

    #[actix_web::test]
    async fn sign_out_ends_session() {
        let identity = LocalIdentity::in_memory();
        let (_, session) = identity.sign_up("a@b.co", "123456").await.unwrap();
        identity.sign_out(&session).await.unwrap();
        assert_eq!(identity.user_for_session(&session), None);
    }

    #[actix_web::test]
    async fn password_update_requires_strong_password() {
        let identity = LocalIdentity::in_memory();
        let (user, _) = identity.sign_up("a@b.co", "123456").await.unwrap();
        assert_eq!(identity.update_password(&user, "short").await, Err(AuthError::WeakPassword));
        identity.update_password(&user, "longer-secret").await.unwrap();

        let old = Credential::for_user(&user, "123456");
        assert_eq!(identity.reauthenticate(&user, &old).await, Err(AuthError::WrongPassword));
        let new = Credential::for_user(&user, "longer-secret");
        identity.reauthenticate(&user, &new).await.unwrap();
    }

    #[actix_web::test]
    async fn delete_drops_account_and_sessions() {
        let identity = LocalIdentity::in_memory();
        let (user, session) = identity.sign_up("a@b.co", "123456").await.unwrap();
        identity.delete(&user).await.unwrap();
        assert_eq!(identity.user_for_session(&session), None);
        assert_eq!(identity.delete(&user).await, Err(AuthError::UserNotFound));
        assert_eq!(identity.sign_in("a@b.co", "123456").await, Err(AuthError::UserNotFound));
    }

    #[actix_web::test]
    async fn accounts_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let identity = LocalIdentity::load(dir.path());
        let (user, _) = identity.sign_up("a@b.co", "123456").await.unwrap();

        let reloaded = LocalIdentity::load(dir.path());
        let (again, _) = reloaded.sign_in("a@b.co", "123456").await.unwrap();
        assert_eq!(again, user);

        reloaded.delete(&user).await.unwrap();
        assert!(LocalIdentity::load(dir.path()).sign_in("a@b.co", "123456").await.is_err());
    }

    #[actix_web::test]
    async fn failed_persist_creates_no_account() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let identity = LocalIdentity::load(&blocker);

        let result = identity.sign_up("a@b.co", "123456").await;
        assert!(matches!(result, Err(AuthError::Unavailable(_))));
        assert!(identity.accounts().is_empty());
        assert!(identity.sessions().is_empty());
    }

    #[test]
    fn expired_sessions_are_dropped_when_a_new_one_starts() {
        let identity = LocalIdentity::in_memory();
        let stale = identity.create_session(&UserID("u1".to_string()));
        assert!(identity.sessions().contains_key(&stale));

        let identity = LocalIdentity { session_lifetime: Duration::seconds(-1), ..identity };
        let fresh = identity.create_session(&UserID("u2".to_string()));
        let sessions = identity.sessions();
        assert!(!sessions.contains_key(&stale));
        assert!(sessions.contains_key(&fresh));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn concurrent_sign_ups_create_one_account_per_email() {
        for _ in 0..50 {
            let identity = LocalIdentity::in_memory();
            let barrier = Barrier::new(8);
            let created = thread::scope(|scope| {
                let workers = (0..8)
                    .map(|_| scope.spawn(|| {
                        barrier.wait();
                        System::new().block_on(identity.sign_up("dup@ctf.org", "secret1")).is_ok()
                    }))
                    .collect::<Vec<_>>();
                workers.into_iter().map(|w| w.join().unwrap()).filter(|ok| *ok).count()
            });
            assert_eq!(created, 1);
            assert_eq!(identity.accounts().len(), 1);
        }
    }
}
