mod user;

pub use user::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserID(pub String);

impl UserID {
    /// A user id is usable iff it looks like one the identity service hands out.
    /// This doesn't check that the user exists.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}
