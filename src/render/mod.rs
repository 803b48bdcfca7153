use actix_web::{http::{header::ContentType, StatusCode}, HttpResponse};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::{
    cookie::{is_menu_logged_in, RequestJar},
    db::MAX_ENTRY_NAME_LEN,
    editor::CtfNameEditor,
    modal::{ModalAction, ModalPresenter},
};

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const MENU_LOGGED_IN_HTML: &str = include_str!("../../assets/element/menu-logged-in.html");
const MENU_LOGGED_OUT_HTML: &str = include_str!("../../assets/element/menu-logged-out.html");
const CTF_ROW_HTML: &str = include_str!("../../assets/element/ctf-row.html");
const ADD_BUTTON_HTML: &str = include_str!("../../assets/element/add-button.html");
const MODAL_HTML: &str = include_str!("../../assets/element/modal.html");
const MODAL_CONFIRM_HTML: &str = include_str!("../../assets/element/modal-confirm.html");

pub const HOME_HTML: &str = include_str!("../../assets/page/home.html");
pub const LOGIN_HTML: &str = include_str!("../../assets/page/login.html");
pub const FILTER_HTML: &str = include_str!("../../assets/page/filter.html");
pub const SETTINGS_HTML: &str = include_str!("../../assets/page/settings.html");
pub const NOT_FOUND_HTML: &str = include_str!("../../assets/page/404.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Login,
    Filter,
    Settings,
    NotFound,
}

impl Page {
    fn id(self) -> &'static str {
        match self {
            Page::Home => "index",
            Page::Login => "login",
            Page::Filter => "filter",
            Page::Settings => "settings",
            Page::NotFound => "not-found",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Login => "Login",
            Page::Filter => "Filter",
            Page::Settings => "Settings",
            Page::NotFound => "Not Found",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Home | Page::NotFound => "/",
            Page::Login => "/login",
            Page::Filter => "/filter",
            Page::Settings => "/settings",
        }
    }
}

/// Wraps page content in the site layout. The menu is picked from the menu
/// cookie, and any cookie writes made through `jar` go out with the response.
pub fn render_page<A, R>(page: Page, jar: &RequestJar, modals: &ModalPresenter<A>, render_content: R) -> HttpResponse
    where A: ModalAction, R: FnOnce() -> String {
    let menu = if is_menu_logged_in(jar) { MENU_LOGGED_IN_HTML } else { MENU_LOGGED_OUT_HTML };
    let html = INDEX_HTML
        .replace("{{title}}", page.title())
        .replace("{{page-id}}", page.id())
        .replace("{{menu}}", menu)
        .replace("{{modals}}", render_modals(modals, page.path()).as_str())
        .replace("{{content}}", render_content().as_str());
    let mut builder = HttpResponse::build(StatusCode::OK);
    builder.content_type(ContentType::html());
    jar.apply(&mut builder);
    builder.body(html)
}

pub fn render_rows(editor: &CtfNameEditor) -> String {
    editor.rows().iter().enumerate()
        .map(|(index, row)| {
            CTF_ROW_HTML
                .replace("{{index}}", index.to_string().as_str())
                .replace("{{max-len}}", MAX_ENTRY_NAME_LEN.to_string().as_str())
                .replace("{{autofocus}}", if editor.focus() == Some(index) { " autofocus" } else { "" })
                .replace("{{value}}", encode_double_quoted_attribute(&row.text).as_ref())
        })
        .collect::<Vec<_>>()
        .join("")
}

pub fn render_filter(editor: &CtfNameEditor, feed_url: &str) -> String {
    FILTER_HTML
        .replace("{{feed-url}}", encode_double_quoted_attribute(feed_url).as_ref())
        .replace("{{add-button}}", if editor.is_add_visible() { ADD_BUTTON_HTML } else { "" })
        .replace("{{rows}}", render_rows(editor).as_str())
}

/// Dialog bodies are already sanitized by the presenter; titles are plain text.
pub fn render_modals<A: ModalAction>(modals: &ModalPresenter<A>, close_href: &str) -> String {
    modals.visible()
        .map(|(id, dialog)| {
            let html = match dialog.action() {
                Some(action) => MODAL_CONFIRM_HTML
                    .replace("{{action}}", encode_double_quoted_attribute(action.form_action()).as_ref()),
                None => MODAL_HTML.to_string(),
            };
            html.replace("{{id}}", id)
                .replace("{{close}}", close_href)
                .replace("{{title}}", encode_text(&dialog.title).as_ref())
                .replace("{{body}}", dialog.body.as_str())
        })
        .collect::<Vec<_>>()
        .join("")
}
