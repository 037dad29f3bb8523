pub mod error;
pub mod service;
pub mod storage;
pub mod upload;

mod types;

pub use error::{GalleryError, Result};
pub use service::GalleryService;
pub use storage::disk::{DiskGallery, GalleryRepository};
pub use types::*;
pub use upload::{MediaPart, UploadProcessor, UploadReceipt, UploadRequest, UploadedFiles};
