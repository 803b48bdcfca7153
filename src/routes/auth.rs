use actix_web::{get, post, web::{Form, Data}, HttpRequest, HttpResponse, http::{StatusCode, header::LOCATION}};
use tracing::{debug, error, warn};
use serde::Deserialize;

use crate::{auth::{build_session_cookie, build_session_removal_cookie, AuthError, IdentityService, SessionID, UserSession}, cookie::{clear_menu, mark_logged_in, RequestJar}, data::User, render::Page};

use super::Identity;

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

/// Short code carried in the `/login?error=` redirect.
pub fn login_error_code(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidEmail => "invalid-email",
        AuthError::WeakPassword => "weak-password",
        AuthError::WrongPassword => "wrong-password",
        AuthError::UserNotFound => "user-not-found",
        AuthError::EmailAlreadyInUse => "email-already-in-use",
        AuthError::Unavailable(_) => "unavailable",
    }
}

pub fn login_error_message(code: &str) -> Option<String> {
    let error = match code {
        "invalid-email" => AuthError::InvalidEmail,
        "weak-password" => AuthError::WeakPassword,
        "wrong-password" => AuthError::WrongPassword,
        "user-not-found" => AuthError::UserNotFound,
        "email-already-in-use" => AuthError::EmailAlreadyInUse,
        "unavailable" => AuthError::Unavailable("please try again later".to_string()),
        _ => return None,
    };
    Some(error.to_string())
}

fn signed_in(req: &HttpRequest, user: &User, session_id: &SessionID) -> HttpResponse {
    let mut jar = RequestJar::from_request(req);
    mark_logged_in(&mut jar);
    debug!("session started for {}", user.id.0);
    let mut response = HttpResponse::build(StatusCode::SEE_OTHER);
    jar.apply(&mut response)
        .append_header((LOCATION, Page::Filter.path()))
        .cookie(build_session_cookie(session_id))
        .finish()
}

fn back_to_login(error: &AuthError) -> HttpResponse {
    HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, format!("/login?error={}", login_error_code(error))))
        .finish()
}

#[post("/auth/signup")]
pub async fn auth_signup(req: HttpRequest, identity: Data<Identity>, Form(form): Form<Credentials>) -> HttpResponse {
    match identity.sign_up(&form.email, &form.password).await {
        Ok((user, session_id)) => signed_in(&req, &user, &session_id),
        Err(e) => {
            warn!("sign up failed: {e}");
            back_to_login(&e)
        },
    }
}

#[post("/auth/login")]
pub async fn auth_login(req: HttpRequest, identity: Data<Identity>, Form(form): Form<Credentials>) -> HttpResponse {
    match identity.sign_in(&form.email, &form.password).await {
        Ok((user, session_id)) => signed_in(&req, &user, &session_id),
        Err(e) => {
            warn!("sign in failed: {e}");
            back_to_login(&e)
        },
    }
}

#[get("/auth/logout")]
pub async fn auth_logout(req: HttpRequest, identity: Data<Identity>, user: UserSession) -> HttpResponse {
    if let Err(e) = identity.sign_out(&user.session_id).await {
        error!("sign out of {} failed: {e}", user.user.id.0);
        return HttpResponse::build(StatusCode::SEE_OTHER)
            .append_header((LOCATION, Page::Home.path()))
            .finish();
    }
    let mut jar = RequestJar::from_request(&req);
    clear_menu(&mut jar);
    let mut response = HttpResponse::build(StatusCode::SEE_OTHER);
    jar.apply(&mut response)
        .append_header((LOCATION, Page::Login.path()))
        .cookie(build_session_removal_cookie())
        .finish()
}
