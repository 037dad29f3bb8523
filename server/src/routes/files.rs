use live_gallery::{AssetView, GalleryError};
use rocket::Either;
use rocket::fs::NamedFile;
use rocket::serde::json::Json;
use rocket::{get, routes, Route, State};

use crate::error::ApiResult;
use crate::Gallery;

const RECORD_SUFFIX: &str = "_metadata.json";

pub fn routes() -> Vec<Route> {
    routes![gallery_file]
}

/// Media files are served as stored. Metadata records are served as their
/// public view so gallery passwords never leave the server.
#[get("/<gallery_id>/<file_name>")]
async fn gallery_file(
    gallery_id: &str,
    file_name: &str,
    gallery: &State<Gallery>,
) -> ApiResult<Either<NamedFile, Json<AssetView>>> {
    if let Some(id) = file_name.strip_suffix(RECORD_SUFFIX) {
        let asset = gallery.get_gallery_asset(gallery_id, id).await?;
        return Ok(Either::Right(Json(asset)));
    }

    let not_found = || GalleryError::NotFound(format!("{}/{}", gallery_id, file_name));
    let path = gallery.repository().file_path(gallery_id, file_name)?;
    match NamedFile::open(path).await {
        Ok(file) => Ok(Either::Left(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found().into()),
        Err(e) => Err(e.into()),
    }
}
