use std::io;
use actix_web::{web::{self, Data}, App, HttpServer, HttpRequest, Responder, Result, middleware::Logger, http::{Method, StatusCode}, HttpResponse, Either};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use writeup_feed_filter::{
    auth::{LocalIdentity, UserSession},
    config::Config,
    db::{FileStore, ProfileClient},
    guard::InFlight,
    render::{render_page, Page, NOT_FOUND_HTML},
    routes::{self, menu_jar, Modals},
};

async fn default_handler(req: HttpRequest, method: Method, user: Option<UserSession>) -> Result<impl Responder> {
    match method {
        Method::GET => {
            let response = render_page(Page::NotFound, &menu_jar(&req, user.is_some()), &Modals::new(), || {
                NOT_FOUND_HTML.to_string()
            })
                .customize()
                .with_status(StatusCode::NOT_FOUND);
            Ok(Either::Left(response))
        }
        _ => Ok(Either::Right(HttpResponse::MethodNotAllowed().finish())),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = Config::load().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    info!("using store at {}", config.store_path.display());

    let identity = Data::new(LocalIdentity::load(&config.store_path));
    let profiles = Data::new(ProfileClient::new(FileStore::new(&config.store_path)));
    let in_flight = Data::new(InFlight::default());
    HttpServer::new(move || {
        App::new()
            .configure(routes::configure)
            .app_data(identity.clone())
            .app_data(profiles.clone())
            .app_data(in_flight.clone())
            .wrap(Logger::default())
            .default_service(web::to(default_handler))
    })
    .bind((config.bind.as_str(), config.port))?
    .run()
    .await
}
