//! Plain name/value cookies set from page logic, and the menu hint cookie.
//!
//! The menu cookie only tells the navigation template which menu to draw
//! before anything else is known. Whether someone is signed in is decided by
//! the session, never by this cookie.

use actix_web::{
    cookie::{time::{Duration, OffsetDateTime}, Cookie, SameSite},
    http::header::COOKIE,
    HttpRequest, HttpResponseBuilder,
};

pub const COOKIE_MENU_TYPE: &str = "menu-type";
pub const COOKIE_MENU_TYPE_LOGGED_IN: &str = "logged-in";

/// Somewhere cookies can be read from as a `name=value; name=value` string and
/// written to one at a time.
pub trait CookieJar {
    fn cookie_string(&self) -> String;
    fn store(&mut self, cookie: Cookie<'static>);
}

/// Writes a cookie on `/`. `days == 0` makes it a session cookie, otherwise it
/// expires `days` days from now (a negative value expires it immediately).
pub fn create_cookie(jar: &mut impl CookieJar, name: &str, value: &str, days: i64) {
    let mut cookie = Cookie::build(name.to_string(), value.to_string())
        .path("/")
        .same_site(SameSite::Lax)
        .finish();
    if days != 0 {
        cookie.set_expires(OffsetDateTime::now_utc() + Duration::days(days));
    }
    jar.store(cookie);
}

pub fn read_cookie(jar: &impl CookieJar, name: &str) -> Option<String> {
    let name_eq = format!("{name}=");
    jar.cookie_string()
        .split(';')
        .map(|c| c.trim_start_matches(' '))
        .find_map(|c| c.strip_prefix(name_eq.as_str()).map(str::to_string))
}

pub fn erase_cookie(jar: &mut impl CookieJar, name: &str) {
    create_cookie(jar, name, "", -1)
}

pub fn mark_logged_in(jar: &mut impl CookieJar) {
    create_cookie(jar, COOKIE_MENU_TYPE, COOKIE_MENU_TYPE_LOGGED_IN, 0)
}

pub fn clear_menu(jar: &mut impl CookieJar) {
    erase_cookie(jar, COOKIE_MENU_TYPE)
}

pub fn is_menu_logged_in(jar: &impl CookieJar) -> bool {
    read_cookie(jar, COOKIE_MENU_TYPE).as_deref() == Some(COOKIE_MENU_TYPE_LOGGED_IN)
}

fn is_expired(cookie: &Cookie) -> bool {
    cookie.expires_datetime().map_or(false, |at| at <= OffsetDateTime::now_utc())
}

/// Cookies of one request/response exchange: reads see the request's cookies
/// and any writes made since, writes are sent back with the response.
#[derive(Debug, Default)]
pub struct RequestJar {
    values: Vec<(String, String)>,
    pending: Vec<Cookie<'static>>,
}

impl RequestJar {
    pub fn from_request(req: &HttpRequest) -> Self {
        let header = req.headers().get_all(COOKIE)
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        Self::from_header(&header)
    }

    pub fn from_header(header: &str) -> Self {
        let values = header.split(';')
            .map(|c| c.trim_start_matches(' '))
            .filter_map(|c| c.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self { values, pending: vec![] }
    }

    /// Adds the writes made through this jar to `response`.
    pub fn apply<'a>(&self, response: &'a mut HttpResponseBuilder) -> &'a mut HttpResponseBuilder {
        for cookie in &self.pending {
            response.cookie(cookie.clone());
        }
        response
    }

    pub fn pending(&self) -> &[Cookie<'static>] {
        &self.pending
    }
}

impl CookieJar for RequestJar {
    fn cookie_string(&self) -> String {
        self.values.iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn store(&mut self, cookie: Cookie<'static>) {
        self.values.retain(|(name, _)| name != cookie.name());
        if !is_expired(&cookie) {
            self.values.push((cookie.name().to_string(), cookie.value().to_string()));
        }
        self.pending.retain(|c| c.name() != cookie.name());
        self.pending.push(cookie);
    }
}

/// Jar kept entirely in memory, dropping cookies once they expire.
#[derive(Debug, Default)]
pub struct MemoryJar {
    cookies: Vec<Cookie<'static>>,
}

impl MemoryJar {
    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().find(|c| c.name() == name)
    }
}

impl CookieJar for MemoryJar {
    fn cookie_string(&self) -> String {
        self.cookies.iter()
            .filter(|c| !is_expired(c))
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn store(&mut self, cookie: Cookie<'static>) {
        self.cookies.retain(|c| c.name() != cookie.name());
        if !is_expired(&cookie) {
            self.cookies.push(cookie);
        }
    }
}
