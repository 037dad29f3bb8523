pub mod convert;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::disk::validate_segment;
use crate::types::{clean_extension, file_url, record_file_name};
use crate::{
    AssetRecord, GalleryError, GalleryPolicy, GalleryRepository, MediaRole, MediaType,
    MediaTypeDetector, Result, ASSET_ID_LEN, DEFAULT_GALLERY_ID, DEFAULT_GALLERY_NAME,
};

use convert::{ImageConverter, PhotoConverter};

/// Default per-file ceiling, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100_000_000;

/// One uploaded file as received from the client.
#[derive(Debug, Clone, Default)]
pub struct MediaPart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MediaPart {
    pub fn new(file_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.to_string()),
            content_type: Some(content_type.to_string()),
            data,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub photo: Option<MediaPart>,
    pub video: Option<MediaPart>,
    pub id: Option<String>,
    pub creation_date: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gallery_id: Option<String>,
    pub gallery_name: Option<String>,
    pub gallery_delete_password: Option<String>,
    pub gallery_view_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFiles {
    pub photo: String,
    pub video: String,
    pub metadata: String,
}

#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub record: AssetRecord,
    pub files: UploadedFiles,
}

/// Validates an upload and persists it as one asset: two media files, then
/// the metadata record.
pub struct UploadProcessor {
    converter: Arc<dyn PhotoConverter>,
    max_file_size: u64,
}

impl Default for UploadProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl UploadProcessor {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            converter: Arc::new(ImageConverter::default()),
            max_file_size,
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn PhotoConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn check_part(&self, role: MediaRole, part: &MediaPart) -> Result<MediaType> {
        if part.data.len() as u64 > self.max_file_size {
            return Err(GalleryError::PayloadTooLarge {
                field: role.field_name(),
                limit: self.max_file_size,
            });
        }

        MediaTypeDetector::detect(
            role,
            part.content_type.as_deref(),
            part.file_name.as_deref(),
            &part.data,
        )
        .map_err(|mime| {
            GalleryError::UnsupportedMediaType(format!(
                "{} is not an accepted {} type",
                mime,
                role.field_name()
            ))
        })
    }

    pub async fn process<R>(&self, repo: &R, request: UploadRequest) -> Result<UploadReceipt>
    where
        R: GalleryRepository + ?Sized,
    {
        let (photo, video) = match (request.photo, request.video) {
            (Some(photo), Some(video)) => (photo, video),
            _ => {
                return Err(GalleryError::Validation(
                    "Both photo and video files are required".to_string(),
                ))
            }
        };

        let photo_type = self.check_part(MediaRole::Photo, &photo)?;
        let video_type = self.check_part(MediaRole::Video, &video)?;

        let gallery_id = non_empty(request.gallery_id)
            .unwrap_or_else(|| DEFAULT_GALLERY_ID.to_string());
        validate_segment(&gallery_id, "gallery id")?;
        let asset_id = asset_id(request.id.as_deref())?;

        // An existing gallery keeps its name and passwords.
        let policy = match repo.gallery_policy(&gallery_id).await? {
            Some(existing) => existing,
            None => GalleryPolicy {
                name: non_empty(request.gallery_name)
                    .unwrap_or_else(|| DEFAULT_GALLERY_NAME.to_string()),
                delete_password: non_empty(request.gallery_delete_password),
                view_password: non_empty(request.gallery_view_password),
            },
        };

        repo.create_gallery_dir(&gallery_id).await?;

        let photo_ext = stored_extension(&photo, photo_type);
        let video_ext = stored_extension(&video, video_type);
        let mut photo_file = format!("{}_photo.{}", asset_id, photo_ext);
        let video_file = format!("{}_video.{}", asset_id, video_ext);

        let mut photo_size = repo.write_media(&gallery_id, &photo_file, &photo.data).await?;
        let video_size = repo.write_media(&gallery_id, &video_file, &video.data).await?;

        if matches!(photo_type, MediaType::Heic | MediaType::Heif) {
            match self.convert(photo.data).await {
                Ok(jpeg) => {
                    let jpeg_file = format!("{}_photo.jpg", asset_id);
                    photo_size = repo.write_media(&gallery_id, &jpeg_file, &jpeg).await?;
                    repo.remove_media(&gallery_id, &photo_file).await?;
                    info!("Converted {} to {}", photo_file, jpeg_file);
                    photo_file = jpeg_file;
                }
                Err(e) => warn!("Keeping {} unconverted: {}", photo_file, e),
            }
        }

        let now = Utc::now();
        let record = AssetRecord {
            id: asset_id,
            photo_file,
            video_file,
            photo_size,
            video_size,
            creation_date: non_empty(request.creation_date).unwrap_or_else(|| now.to_rfc3339()),
            upload_date: now,
            latitude: request.latitude,
            longitude: request.longitude,
            gallery_id,
            gallery_name: policy.name,
            gallery_delete_password: policy.delete_password,
            gallery_view_password: policy.view_password,
        };
        repo.write_record(&record).await?;

        info!(
            "Stored asset {} in gallery {} ({} + {} bytes)",
            record.id, record.gallery_id, record.photo_size, record.video_size
        );

        let files = UploadedFiles {
            photo: file_url(&record.gallery_id, &record.photo_file),
            video: file_url(&record.gallery_id, &record.video_file),
            metadata: file_url(&record.gallery_id, &record_file_name(&record.id)),
        };
        Ok(UploadReceipt { record, files })
    }

    async fn convert(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let converter = Arc::clone(&self.converter);
        tokio::task::spawn_blocking(move || converter.to_jpeg(&data))
            .await
            .map_err(|e| GalleryError::Conversion(e.to_string()))?
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Client id truncated to [`ASSET_ID_LEN`] characters, or a fresh random one.
pub(crate) fn asset_id(client_id: Option<&str>) -> Result<String> {
    match client_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            let id: String = id.chars().take(ASSET_ID_LEN).collect();
            if id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                Ok(id)
            } else {
                Err(GalleryError::Validation(format!("Invalid asset id: {:?}", id)))
            }
        }
        None => Ok(Uuid::new_v4().simple().to_string()[..ASSET_ID_LEN].to_string()),
    }
}

/// The client's extension when it names the accepted type, otherwise the
/// type's canonical one.
fn stored_extension(part: &MediaPart, media: MediaType) -> String {
    part.file_name
        .as_deref()
        .and_then(clean_extension)
        .filter(|ext| MediaType::from_extension(ext) == Some(media))
        .unwrap_or_else(|| media.extension().to_string())
}
