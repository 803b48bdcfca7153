//! Password change and account deletion for the signed-in user.
//!
//! Both operations start by proving the current password again. Deletion then
//! removes the profile record before the identity itself; the two steps are
//! independent, so a failure in between leaves the identity in place and the
//! whole operation can simply be run again.

use tracing::{error, info, warn};
use thiserror::Error;

use crate::{
    auth::{AuthError, Credential, IdentityService},
    data::User,
    db::{DocumentStore, ProfileClient, StoreError},
    guard::InFlight,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Anonymous,
    Authenticated,
    ReauthPending,
    PasswordChanged,
    AccountDeleted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Another account operation is still in progress")]
    Busy,
    #[error("You are not signed in")]
    SignedOut,
}

impl AccountError {
    /// Text for the error dialog. Messages coming from the identity service or
    /// the store are escaped before being put into markup.
    pub fn dialog_message(&self) -> String {
        match self {
            Self::Auth(_) | Self::Store(_) => format!(
                "An error has occurred. <br/>{}",
                html_escape::encode_text(&self.to_string())
            ),
            _ => html_escape::encode_text(&self.to_string()).to_string(),
        }
    }
}

fn validation(message: &str) -> AccountError {
    AccountError::Validation(message.to_string())
}

pub struct AccountController<'a, I, S> {
    identity: &'a I,
    profiles: &'a ProfileClient<S>,
    in_flight: &'a InFlight,
    user: Option<User>,
    state: AccountState,
}

impl<'a, I: IdentityService, S: DocumentStore> AccountController<'a, I, S> {
    pub fn new(identity: &'a I, profiles: &'a ProfileClient<S>, in_flight: &'a InFlight) -> Self {
        Self { identity, profiles, in_flight, user: None, state: AccountState::Anonymous }
    }

    /// Follows the identity service's view of who is signed in.
    pub fn on_auth_change(&mut self, user: Option<User>) {
        self.state = if user.is_some() { AccountState::Authenticated } else { AccountState::Anonymous };
        self.user = user;
    }

    pub fn state(&self) -> AccountState {
        self.state
    }

    /// E-mail of the signed-in user, for the account page.
    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.email.as_str())
    }

    async fn reauthenticate(&mut self, user: &User, password: &str) -> Result<(), AccountError> {
        self.state = AccountState::ReauthPending;
        let result = self.identity.reauthenticate(user, &Credential::for_user(user, password)).await;
        self.state = AccountState::Authenticated;
        result.map_err(|e| {
            warn!("re-authentication of {} failed: {e}", user.id.0);
            e.into()
        })
    }

    /// Checked locally first; nothing is sent to the identity service unless
    /// all fields are filled in and the new passwords match.
    pub async fn change_password(&mut self, current_password: &str, new_password_1: &str, new_password_2: &str) -> Result<(), AccountError> {
        let user = self.user.clone().ok_or(AccountError::SignedOut)?;
        if current_password.is_empty() {
            return Err(validation("Please enter current password"));
        }
        if new_password_1.is_empty() {
            return Err(validation("Please enter new password"));
        }
        if new_password_1 != new_password_2 {
            return Err(validation("New passwords don't match"));
        }
        let in_flight = self.in_flight;
        let Some(_token) = in_flight.try_begin(&user.id) else {
            return Err(AccountError::Busy);
        };

        self.reauthenticate(&user, current_password).await?;
        self.identity.update_password(&user, new_password_1).await.map_err(|e| {
            warn!("password update of {} failed: {e}", user.id.0);
            AccountError::from(e)
        })?;
        self.state = AccountState::PasswordChanged;
        info!("password changed for {}", user.id.0);
        Ok(())
    }

    /// Deletes the profile record, then the identity. Safe to retry after a
    /// partial failure.
    pub async fn delete_account(&mut self, current_password: &str) -> Result<(), AccountError> {
        let user = self.user.clone().ok_or(AccountError::SignedOut)?;
        if current_password.is_empty() {
            return Err(validation("In order to delete your account you must re-enter your current password"));
        }
        let in_flight = self.in_flight;
        let Some(_token) = in_flight.try_begin(&user.id) else {
            return Err(AccountError::Busy);
        };

        self.reauthenticate(&user, current_password).await?;
        self.profiles.delete_profile(&user.id).await.map_err(|e| {
            error!("deleting profile of {} failed: {e}", user.id.0);
            AccountError::from(e)
        })?;
        self.identity.delete(&user).await.map_err(|e| {
            error!("deleting identity {} failed after its profile was removed: {e}", user.id.0);
            AccountError::from(e)
        })?;
        self.state = AccountState::AccountDeleted;
        self.user = None;
        Ok(())
    }
}
