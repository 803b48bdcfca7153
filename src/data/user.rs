use super::UserID;

/// The signed-in identity as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserID,
    pub email: String,
}

impl User {
    pub fn feed_url(&self, origin: &str) -> String {
        format!("{}/writeups/{}", origin.trim_end_matches('/'), self.id.0)
    }
}
