use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("{0}")]
    Validation(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("{field} exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { field: &'static str, limit: u64 },
    #[error("Password required")]
    AuthRequired,
    #[error("{0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conversion failed: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse metadata: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GalleryError {
    /// HTTP status code equivalent of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GalleryError::Validation(_) => 400,
            GalleryError::AuthRequired => 401,
            GalleryError::Forbidden(_) => 403,
            GalleryError::NotFound(_) => 404,
            GalleryError::PayloadTooLarge { .. } => 413,
            GalleryError::UnsupportedMediaType(_) => 415,
            GalleryError::Conversion(_)
            | GalleryError::Io(_)
            | GalleryError::Serialization(_)
            | GalleryError::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(GalleryError::Validation("x".into()).status_code(), 400);
        assert_eq!(GalleryError::AuthRequired.status_code(), 401);
        assert_eq!(GalleryError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(GalleryError::NotFound("x".into()).status_code(), 404);
        assert_eq!(GalleryError::PayloadTooLarge { field: "photo", limit: 1 }.status_code(), 413);
        assert_eq!(GalleryError::UnsupportedMediaType("text/plain".into()).status_code(), 415);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(GalleryError::from(io).status_code(), 500);
    }
}
