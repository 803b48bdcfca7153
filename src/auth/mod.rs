use std::{pin::Pin, future::{Future, ready}};

use actix_web::{cookie::{self, Cookie, SameSite}, dev::Payload, http::{header::LOCATION, StatusCode}, web::Data, FromRequest, HttpRequest, HttpResponse, ResponseError};

use crate::{cookie::{clear_menu, RequestJar}, data::User};

pub mod local;

pub use local::LocalIdentity;

pub const SESSION_COOKIE: &str = "session-id";

/// Shortest password the identity service accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionID(pub String);

/// E-mail and password proving who is asking.
#[derive(Clone)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn for_user(user: &User, password: &str) -> Self {
        Self { email: user.email.clone(), password: password.to_string() }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("The email address is badly formatted.")]
    InvalidEmail,
    #[error("Password should be at least 6 characters")]
    WeakPassword,
    #[error("The password is invalid or the user does not have a password.")]
    WrongPassword,
    #[error("There is no user record corresponding to this identifier. The user may have been deleted.")]
    UserNotFound,
    #[error("The email address is already in use by another account.")]
    EmailAlreadyInUse,
    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),
}

/// The identity provider. Every remote operation resolves to a value or an
/// [`AuthError`] carrying a message fit for the user.
#[allow(async_fn_in_trait)]
pub trait IdentityService {
    /// The user signed in with `session`, if it is still valid.
    fn user_for_session(&self, session: &SessionID) -> Option<User>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<(User, SessionID), AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<(User, SessionID), AuthError>;
    async fn sign_out(&self, session: &SessionID) -> Result<(), AuthError>;
    async fn reauthenticate(&self, user: &User, credential: &Credential) -> Result<(), AuthError>;
    async fn update_password(&self, user: &User, new_password: &str) -> Result<(), AuthError>;
    /// Deletes the identity and ends all of its sessions.
    async fn delete(&self, user: &User) -> Result<(), AuthError>;
}

pub fn build_session_cookie(session_id: &SessionID) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session_id.0.clone())
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .max_age(cookie::time::Duration::days(30))
        .finish()
}

pub fn build_session_removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// The signed-in user of a request, resolved from the session cookie.
pub struct UserSession {
    pub user: User,
    pub session_id: SessionID,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionRequestError {
    #[error("No Session")]
    NoSession,
}

impl ResponseError for SessionRequestError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    /// Without a user every page falls back to the sign-in view.
    fn error_response(&self) -> HttpResponse {
        let mut jar = RequestJar::default();
        clear_menu(&mut jar);
        let mut response = HttpResponse::build(self.status_code());
        jar.apply(&mut response)
            .append_header((LOCATION, "/login"))
            .finish()
    }
}

impl FromRequest for UserSession {
    type Error = SessionRequestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.app_data::<Data<LocalIdentity>>()
            .zip(req.cookie(SESSION_COOKIE))
            .and_then(|(identity, cookie)| {
                let session_id = SessionID(cookie.value().to_string());
                identity.user_for_session(&session_id).map(|user| UserSession { user, session_id })
            });
        Box::pin(ready(session.ok_or(SessionRequestError::NoSession)))
    }
}
