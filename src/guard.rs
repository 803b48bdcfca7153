use std::{collections::HashSet, sync::{Mutex, PoisonError}};

use crate::data::UserID;

/// Tracks which users have a write running so a second one is refused instead
/// of racing the first. List saves, password changes and account deletion
/// share one instance per server.
#[derive(Debug, Default)]
pub struct InFlight {
    active: Mutex<HashSet<UserID>>,
}

/// Held for the duration of an operation. Dropping it ends the operation.
#[derive(Debug)]
pub struct InFlightToken<'a> {
    owner: &'a InFlight,
    user: UserID,
}

impl InFlight {
    /// `None` if `user` already has an operation running.
    pub fn try_begin(&self, user: &UserID) -> Option<InFlightToken<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.insert(user.clone()).then(|| InFlightToken { owner: self, user: user.clone() })
    }

    pub fn is_active(&self, user: &UserID) -> bool {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).contains(user)
    }
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.owner.active.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.user);
    }
}
