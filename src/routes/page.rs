use actix_web::{get, http::{header::LOCATION, StatusCode}, web::{Data, Query}, HttpRequest, HttpResponse};
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::error;
use serde::Deserialize;

use crate::{
    account::AccountController,
    auth::{IdentityService, UserSession},
    cookie::{clear_menu, is_menu_logged_in, mark_logged_in, RequestJar},
    db::DocumentStore,
    editor::CtfNameEditor,
    guard::InFlight,
    modal::{ModalPresenter, MODAL_ERROR},
    render::{render_filter, render_page, Page, HOME_HTML, LOGIN_HTML, SETTINGS_HTML},
};

use super::{login_error_message, origin, ConfirmAction, Identity, Profiles};

pub type Modals = ModalPresenter<ConfirmAction>;

/// Cookie jar of a request, with the menu hint brought in line with whether
/// there is a signed-in user.
pub fn menu_jar(req: &HttpRequest, signed_in: bool) -> RequestJar {
    let mut jar = RequestJar::from_request(req);
    if signed_in && !is_menu_logged_in(&jar) {
        mark_logged_in(&mut jar);
    } else if !signed_in && is_menu_logged_in(&jar) {
        clear_menu(&mut jar);
    }
    jar
}

pub fn render_filter_page(req: &HttpRequest, user: &UserSession, editor: &CtfNameEditor, modals: &Modals) -> HttpResponse {
    let feed_url = user.user.feed_url(&origin(&req.connection_info()));
    render_page(Page::Filter, &menu_jar(req, true), modals, || render_filter(editor, &feed_url))
}

/// The account e-mail shown is whatever the controller was last told about.
pub fn render_settings_page<I, S>(req: &HttpRequest, account: &AccountController<I, S>, modals: &Modals) -> HttpResponse
    where I: IdentityService, S: DocumentStore {
    let email = account.email().unwrap_or_default();
    render_page(Page::Settings, &menu_jar(req, account.email().is_some()), modals, || {
        SETTINGS_HTML.replace("{{email}}", encode_double_quoted_attribute(email).as_ref())
    })
}

#[get("/")]
pub async fn page_home(req: HttpRequest, user: Option<UserSession>) -> HttpResponse {
    render_page(Page::Home, &menu_jar(&req, user.is_some()), &Modals::new(), || HOME_HTML.to_string())
}

#[derive(Debug, Deserialize)]
pub struct Error {
    error: Option<String>,
}

#[get("/login")]
pub async fn page_login(req: HttpRequest, user: Option<UserSession>, query: Query<Error>) -> HttpResponse {
    if user.is_some() {
        return HttpResponse::build(StatusCode::SEE_OTHER)
            .append_header((LOCATION, Page::Filter.path()))
            .finish();
    }
    let message = query.0.error.as_deref().and_then(login_error_message).unwrap_or_default();
    render_page(Page::Login, &menu_jar(&req, false), &Modals::new(), || {
        LOGIN_HTML.replace("{{insert-error-here}}", encode_text(&message).as_ref())
    })
}

#[get("/filter")]
pub async fn page_filter(req: HttpRequest, profiles: Data<Profiles>, user: UserSession) -> HttpResponse {
    let mut modals = Modals::new();
    let editor = match profiles.get_names(&user.user.id).await {
        Ok(names) => CtfNameEditor::load(names),
        Err(e) => {
            error!("loading CTF names of {} failed: {e}", user.user.id.0);
            modals.show(MODAL_ERROR, "Error", "An error ocurred while trying to retrieve your data.", None);
            CtfNameEditor::default()
        },
    };
    render_filter_page(&req, &user, &editor, &modals)
}

#[get("/settings")]
pub async fn page_settings(req: HttpRequest, identity: Data<Identity>, profiles: Data<Profiles>, in_flight: Data<InFlight>, user: UserSession) -> HttpResponse {
    let mut account = AccountController::new(identity.get_ref(), profiles.get_ref(), in_flight.get_ref());
    account.on_auth_change(Some(user.user));
    render_settings_page(&req, &account, &Modals::new())
}
