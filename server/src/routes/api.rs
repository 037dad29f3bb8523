use chrono::Utc;
use live_gallery::{AssetView, MediaPart, UploadRequest};
use rocket::form::{self, Form};
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{delete, get, post, routes, FromForm, Route, State};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::error::ApiResult;
use crate::Gallery;

pub fn routes() -> Vec<Route> {
    routes![
        health,
        upload,
        list_galleries,
        list_photos,
        get_photo,
        delete_photo,
        delete_gallery
    ]
}

#[derive(FromForm)]
pub struct UploadForm<'r> {
    photo: Option<TempFile<'r>>,
    video: Option<TempFile<'r>>,
    id: Option<String>,
    creation_date: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    gallery_id: Option<String>,
    gallery_name: Option<String>,
    gallery_delete_password: Option<String>,
    gallery_view_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PasswordBody {
    password: Option<String>,
}

async fn read_part(file: &TempFile<'_>) -> ApiResult<MediaPart> {
    let file_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string());
    let content_type = file
        .content_type()
        .map(|ct| format!("{}/{}", ct.media_type().top(), ct.media_type().sub()));

    let mut data = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await?;
    tokio::pin!(reader);
    reader.read_to_end(&mut data).await?;

    Ok(MediaPart { file_name, content_type, data })
}

/// Coordinates that fail to parse are treated as absent.
fn coordinate(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[get("/health")]
fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

#[post("/api/upload", data = "<form>")]
async fn upload(
    form: Result<Form<UploadForm<'_>>, form::Errors<'_>>,
    gallery: &State<Gallery>,
) -> ApiResult<(Status, Json<Value>)> {
    let form = form?.into_inner();

    let photo = match &form.photo {
        Some(file) => Some(read_part(file).await?),
        None => None,
    };
    let video = match &form.video {
        Some(file) => Some(read_part(file).await?),
        None => None,
    };

    let receipt = gallery
        .upload(UploadRequest {
            photo,
            video,
            latitude: coordinate(form.latitude.as_deref()),
            longitude: coordinate(form.longitude.as_deref()),
            id: form.id,
            creation_date: form.creation_date,
            gallery_id: form.gallery_id,
            gallery_name: form.gallery_name,
            gallery_delete_password: form.gallery_delete_password,
            gallery_view_password: form.gallery_view_password,
        })
        .await?;

    Ok((
        Status::Created,
        Json(json!({
            "success": true,
            "id": receipt.record.id,
            "galleryId": receipt.record.gallery_id,
            "files": receipt.files,
        })),
    ))
}

#[get("/api/photos/galleries")]
async fn list_galleries(gallery: &State<Gallery>) -> ApiResult<Json<Value>> {
    let galleries = gallery.list_galleries().await?;
    Ok(Json(json!({ "count": galleries.len(), "galleries": galleries })))
}

#[get("/api/photos?<gallery>&<p>")]
async fn list_photos(
    gallery: Option<&str>,
    p: Option<&str>,
    service: &State<Gallery>,
) -> ApiResult<Json<Value>> {
    let gallery = gallery.filter(|g| !g.is_empty());
    let photos = service.list_assets(gallery, p).await?;
    Ok(Json(json!({ "count": photos.len(), "photos": photos })))
}

#[get("/api/photos/<id>")]
async fn get_photo(id: &str, gallery: &State<Gallery>) -> ApiResult<Json<AssetView>> {
    Ok(Json(gallery.get_asset(id).await?))
}

#[delete("/api/photos/<id>", data = "<body>")]
async fn delete_photo(
    id: &str,
    body: Option<Json<PasswordBody>>,
    gallery: &State<Gallery>,
) -> ApiResult<Json<Value>> {
    let password = body.and_then(|b| b.into_inner().password);
    let deleted = gallery.delete_asset(id, password.as_deref()).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted.id })))
}

#[delete("/api/gallery/<gallery_id>", data = "<body>")]
async fn delete_gallery(
    gallery_id: &str,
    body: Option<Json<PasswordBody>>,
    gallery: &State<Gallery>,
) -> ApiResult<Json<Value>> {
    let password = body.and_then(|b| b.into_inner().password);
    let count = gallery.delete_gallery(gallery_id, password.as_deref()).await?;
    Ok(Json(json!({ "success": true, "deleted": gallery_id, "assets": count })))
}
