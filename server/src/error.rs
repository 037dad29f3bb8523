use live_gallery::GalleryError;
use rocket::form;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};
use rocket::Request;
use tracing::error;

/// A failed request, rendered as `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl From<GalleryError> for ApiError {
    fn from(err: GalleryError) -> Self {
        let status = Status::from_code(err.status_code()).unwrap_or(Status::InternalServerError);
        if status.code >= 500 {
            error!("Request failed: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        GalleryError::from(err).into()
    }
}

impl<'v> From<form::Errors<'v>> for ApiError {
    fn from(errors: form::Errors<'v>) -> Self {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(errors.status(), message)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).respond_to(req)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
