use std::io::Result;
use actix_files::NamedFile;
use actix_web::get;

#[get("/style.css")]
pub async fn css_style() -> Result<NamedFile> {
    NamedFile::open("assets/style.css")
}
