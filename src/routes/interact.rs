use actix_web::{post, http::{header::LOCATION, StatusCode}, web::{Data, Form}, HttpRequest, HttpResponse};
use tracing::error;
use serde::Deserialize;

use crate::{
    account::AccountController,
    auth::{build_session_removal_cookie, IdentityService, UserSession},
    cookie::{clear_menu, RequestJar},
    editor::{CtfNameEditor, EditorError},
    guard::InFlight,
    modal::{MODAL_CONFIRM, MODAL_ERROR, MODAL_SUCCESS},
    render::Page,
};

use super::{render_filter_page, render_settings_page, ConfirmAction, Identity, Modals, Profiles};

/// What a submission of the filter form asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Add,
    Remove(usize),
    Save,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "add" => Some(FilterOp::Add),
            "save" => Some(FilterOp::Save),
            _ => op.strip_prefix("remove-").and_then(|i| i.parse().ok()).map(FilterOp::Remove),
        }
    }
}

#[derive(Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password_1: String,
    #[serde(default)]
    new_password_2: String,
}

#[derive(Deserialize)]
pub struct ConfirmPasswordForm {
    #[serde(default)]
    password: String,
}

/// The filter form posts every row as a repeated `entry` field plus the `op`
/// of the button that was pressed.
#[post("/do/filter")]
pub async fn edit_filter(req: HttpRequest, profiles: Data<Profiles>, in_flight: Data<InFlight>, user: UserSession, Form(fields): Form<Vec<(String, String)>>) -> HttpResponse {
    let mut editor = CtfNameEditor::from_rows(
        fields.iter().filter(|(key, _)| key == "entry").map(|(_, value)| value)
    );
    let op = fields.iter().find(|(key, _)| key == "op").and_then(|(_, value)| FilterOp::parse(value));
    let mut modals = Modals::new();
    match op {
        Some(FilterOp::Add) => {
            editor.add_row();
        },
        Some(FilterOp::Remove(index)) => {
            editor.remove_row(index);
        },
        Some(FilterOp::Save) => match editor.save(profiles.get_ref(), in_flight.get_ref(), &user.user.id).await {
            Ok(_) => modals.show(MODAL_SUCCESS, "Changes Saved",
                "Your changes were saved successfully. Your feed will reflect them automatically.", None),
            Err(EditorError::Busy) => modals.show(MODAL_ERROR, "Error",
                "Your previous changes are still being saved. Please try again in a moment.", None),
            Err(EditorError::Store(_)) => modals.show(MODAL_ERROR, "Error",
                "An error ocurred while trying to save your changes.", None),
        },
        None => {},
    }
    render_filter_page(&req, &user, &editor, &modals)
}

#[post("/do/update-password")]
pub async fn update_password(req: HttpRequest, identity: Data<Identity>, profiles: Data<Profiles>, in_flight: Data<InFlight>, user: UserSession, Form(form): Form<PasswordForm>) -> HttpResponse {
    let mut account = AccountController::new(identity.get_ref(), profiles.get_ref(), in_flight.get_ref());
    account.on_auth_change(Some(user.user));
    let mut modals = Modals::new();
    match account.change_password(&form.current_password, &form.new_password_1, &form.new_password_2).await {
        Ok(()) => modals.show(MODAL_SUCCESS, "Password Updated",
            "<p>Your password was updated successfully!</p>", None),
        Err(e) => modals.show(MODAL_ERROR, "Error", &format!("<p>{}</p>", e.dialog_message()), None),
    }
    render_settings_page(&req, &account, &modals)
}

fn delete_confirmation() -> Modals {
    let mut modals = Modals::new();
    modals.show(MODAL_CONFIRM, "Are you sure?",
        "<p>Deleting your account cannot be undone. You'll also lose your custom feed.\
        <br/>To permanently delete your account, enter your password and click \"Confirm\".</p>\
        <input type='password' id='confirm_password_delete_account' name='password' autocomplete='current-password'/>",
        Some(ConfirmAction::DeleteAccount));
    modals
}

#[post("/do/delete-account")]
pub async fn delete_account(req: HttpRequest, identity: Data<Identity>, profiles: Data<Profiles>, in_flight: Data<InFlight>, user: UserSession) -> HttpResponse {
    let mut account = AccountController::new(identity.get_ref(), profiles.get_ref(), in_flight.get_ref());
    account.on_auth_change(Some(user.user));
    render_settings_page(&req, &account, &delete_confirmation())
}

/// Submitted from the confirmation dialog. The dialog is hidden whatever the
/// outcome; failures are reported in the error dialog instead.
#[post("/do/delete-account/confirm")]
pub async fn confirm_delete_account(req: HttpRequest, identity: Data<Identity>, profiles: Data<Profiles>, in_flight: Data<InFlight>, user: UserSession, Form(form): Form<ConfirmPasswordForm>) -> HttpResponse {
    let mut account = AccountController::new(identity.get_ref(), profiles.get_ref(), in_flight.get_ref());
    account.on_auth_change(Some(user.user.clone()));
    let mut modals = delete_confirmation();
    let action = modals.take_action(MODAL_CONFIRM);
    modals.hide(MODAL_CONFIRM);
    let result = match action {
        Some(ConfirmAction::DeleteAccount) => account.delete_account(&form.password).await,
        None => Ok(()),
    };
    match result {
        Ok(()) => {
            // The identity is gone along with its sessions.
            account.on_auth_change(identity.user_for_session(&user.session_id));
            let mut jar = RequestJar::from_request(&req);
            clear_menu(&mut jar);
            let mut response = HttpResponse::build(StatusCode::SEE_OTHER);
            jar.apply(&mut response)
                .append_header((LOCATION, Page::Login.path()))
                .cookie(build_session_removal_cookie())
                .finish()
        },
        Err(e) => {
            error!("account deletion for {} failed: {e}", user.user.id.0);
            modals.show(MODAL_ERROR, "Error", &format!("<p>{}</p>", e.dialog_message()), None);
            render_settings_page(&req, &account, &modals)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter_ops() {
        assert_eq!(FilterOp::parse("add"), Some(FilterOp::Add));
        assert_eq!(FilterOp::parse("save"), Some(FilterOp::Save));
        assert_eq!(FilterOp::parse("remove-3"), Some(FilterOp::Remove(3)));
        assert_eq!(FilterOp::parse("remove-x"), None);
        assert_eq!(FilterOp::parse("drop"), None);
    }
}
