use actix_web::{dev::ConnectionInfo, web::ServiceConfig};

use crate::{auth::LocalIdentity, db::{FileStore, ProfileClient}, modal::ModalAction};

mod auth;
mod interact;
mod page;
mod resources;

pub use auth::*;
pub use interact::*;
pub use page::*;
pub use resources::*;

pub type Profiles = ProfileClient<FileStore>;
pub type Identity = LocalIdentity;

/// Actions a confirmation dialog can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteAccount,
}

impl ModalAction for ConfirmAction {
    fn form_action(&self) -> &str {
        match self {
            ConfirmAction::DeleteAccount => "/do/delete-account/confirm",
        }
    }
}

pub fn origin(info: &ConnectionInfo) -> String {
    format!("{}://{}", info.scheme(), info.host())
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg
        .service(auth_signup)
        .service(auth_login)
        .service(auth_logout)

        .service(page_home)
        .service(page_login)
        .service(page_filter)
        .service(page_settings)

        .service(edit_filter)
        .service(update_password)
        .service(delete_account)
        .service(confirm_delete_account)

        .service(css_style);
}
