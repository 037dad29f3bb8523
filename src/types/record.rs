use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The JSON record persisted as `{id}_metadata.json` next to its media files.
///
/// Gallery name and passwords are duplicated into every record of a gallery;
/// there is no separate gallery entity on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: String,
    pub photo_file: String,
    pub video_file: String,
    pub photo_size: u64,
    pub video_size: u64,
    pub creation_date: String,
    pub upload_date: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gallery_id: String,
    pub gallery_name: String,
    pub gallery_delete_password: Option<String>,
    pub gallery_view_password: Option<String>,
}

impl AssetRecord {
    pub fn record_file_name(&self) -> String {
        record_file_name(&self.id)
    }

    pub fn policy(&self) -> GalleryPolicy {
        GalleryPolicy {
            name: self.gallery_name.clone(),
            delete_password: self.gallery_delete_password.clone(),
            view_password: self.gallery_view_password.clone(),
        }
    }
}

pub(crate) fn record_file_name(id: &str) -> String {
    format!("{}_metadata.json", id)
}

pub(crate) fn file_url(gallery_id: &str, file_name: &str) -> String {
    format!("/files/{}/{}", gallery_id, file_name)
}

/// Access policy of a gallery, reconstructed from one of its records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryPolicy {
    pub name: String,
    pub delete_password: Option<String>,
    pub view_password: Option<String>,
}

impl GalleryPolicy {
    pub fn requires_view_password(&self) -> bool {
        self.view_password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// An asset as returned to callers: the record without its passwords, plus
/// the public URLs of its files.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    pub id: String,
    pub photo_file: String,
    pub video_file: String,
    pub photo_size: u64,
    pub video_size: u64,
    pub creation_date: String,
    pub upload_date: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gallery_id: String,
    pub gallery_name: String,
    pub has_delete_password: bool,
    pub has_view_password: bool,
    pub photo_url: String,
    pub video_url: String,
}

impl From<AssetRecord> for AssetView {
    fn from(record: AssetRecord) -> Self {
        let has_view_password = record.policy().requires_view_password();
        Self {
            photo_url: file_url(&record.gallery_id, &record.photo_file),
            video_url: file_url(&record.gallery_id, &record.video_file),
            has_delete_password: record
                .gallery_delete_password
                .as_deref()
                .is_some_and(|p| !p.is_empty()),
            has_view_password,
            id: record.id,
            photo_file: record.photo_file,
            video_file: record.video_file,
            photo_size: record.photo_size,
            video_size: record.video_size,
            creation_date: record.creation_date,
            upload_date: record.upload_date,
            latitude: record.latitude,
            longitude: record.longitude,
            gallery_id: record.gallery_id,
            gallery_name: record.gallery_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GallerySummary {
    pub id: String,
    pub name: String,
    pub photo_count: usize,
    pub last_updated: DateTime<Utc>,
    pub is_protected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AssetRecord {
        AssetRecord {
            id: "a1b2c3d4".to_string(),
            photo_file: "a1b2c3d4_photo.jpg".to_string(),
            video_file: "a1b2c3d4_video.mov".to_string(),
            photo_size: 10,
            video_size: 20,
            creation_date: "2024-05-01T10:00:00Z".to_string(),
            upload_date: Utc::now(),
            latitude: Some(48.85),
            longitude: None,
            gallery_id: "trip".to_string(),
            gallery_name: "Trip".to_string(),
            gallery_delete_password: Some("secret".to_string()),
            gallery_view_password: None,
        }
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["photoFile"], "a1b2c3d4_photo.jpg");
        assert_eq!(json["galleryDeletePassword"], "secret");
        assert!(json["galleryViewPassword"].is_null());
        assert!(json["longitude"].is_null());
    }

    #[test]
    fn record_without_optional_keys_parses() {
        let json = r#"{
            "id": "deadbeef",
            "photoFile": "deadbeef_photo.png",
            "videoFile": "deadbeef_video.mp4",
            "photoSize": 1,
            "videoSize": 2,
            "creationDate": "yesterday",
            "uploadDate": "2024-01-02T03:04:05.678Z",
            "galleryId": "default",
            "galleryName": "Default Gallery"
        }"#;
        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.latitude, None);
        assert_eq!(record.gallery_view_password, None);
    }

    #[test]
    fn view_hides_passwords_and_derives_urls() {
        let view = AssetView::from(sample());
        assert_eq!(view.photo_url, "/files/trip/a1b2c3d4_photo.jpg");
        assert_eq!(view.video_url, "/files/trip/a1b2c3d4_video.mov");
        assert!(view.has_delete_password);
        assert!(!view.has_view_password);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn empty_view_password_is_not_a_gate() {
        let mut record = sample();
        record.gallery_view_password = Some(String::new());
        assert!(!record.policy().requires_view_password());
    }
}
