use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which half of a Live Photo a media part is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRole {
    Photo,
    Video,
}

impl MediaRole {
    pub fn field_name(&self) -> &'static str {
        match self {
            MediaRole::Photo => "photo",
            MediaRole::Video => "video",
        }
    }
}

/// The media types an upload may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Heic,
    Heif,
    Jpeg,
    Png,
    QuickTime,
    Mp4,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/heic" => Some(MediaType::Heic),
            "image/heif" => Some(MediaType::Heif),
            "image/jpeg" => Some(MediaType::Jpeg),
            "image/png" => Some(MediaType::Png),
            "video/quicktime" => Some(MediaType::QuickTime),
            "video/mp4" => Some(MediaType::Mp4),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "heic" => Some(MediaType::Heic),
            "heif" => Some(MediaType::Heif),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "mov" | "qt" => Some(MediaType::QuickTime),
            "mp4" | "m4v" => Some(MediaType::Mp4),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Heic => "image/heic",
            MediaType::Heif => "image/heif",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::QuickTime => "video/quicktime",
            MediaType::Mp4 => "video/mp4",
        }
    }

    /// Extension used on disk when the client filename carries none.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Heic => "heic",
            MediaType::Heif => "heif",
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
            MediaType::QuickTime => "mov",
            MediaType::Mp4 => "mp4",
        }
    }

    pub fn role(&self) -> MediaRole {
        match self {
            MediaType::Heic | MediaType::Heif | MediaType::Jpeg | MediaType::Png => {
                MediaRole::Photo
            }
            MediaType::QuickTime | MediaType::Mp4 => MediaRole::Video,
        }
    }
}

pub struct MediaTypeDetector;

impl MediaTypeDetector {
    /// Effective MIME type of an uploaded part.
    ///
    /// The declared type wins unless it is missing or the generic
    /// `application/octet-stream`; then the bytes are sniffed, and finally
    /// the filename extension is consulted.
    pub fn effective_mime(declared: Option<&str>, file_name: Option<&str>, data: &[u8]) -> String {
        if let Some(mime) = declared.map(str::trim).filter(|m| {
            !m.is_empty() && !m.eq_ignore_ascii_case("application/octet-stream")
        }) {
            return mime.to_ascii_lowercase();
        }

        if let Some(kind) = infer::get(data) {
            return kind.mime_type().to_string();
        }

        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .and_then(MediaType::from_extension)
            .map(|t| t.mime().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    /// Detects the media type of a part and checks it against the allow-list
    /// for `role`. The error carries the rejected MIME type.
    pub fn detect(
        role: MediaRole,
        declared: Option<&str>,
        file_name: Option<&str>,
        data: &[u8],
    ) -> std::result::Result<MediaType, String> {
        let mime = Self::effective_mime(declared, file_name, data);
        match MediaType::from_mime(&mime) {
            Some(media) if media.role() == role => Ok(media),
            _ => Err(mime),
        }
    }
}

/// Lower-cased extension of a client filename, if it is plain alphanumeric.
pub(crate) fn clean_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}
