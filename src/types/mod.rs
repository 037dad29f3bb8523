mod file;
mod record;

pub use file::{MediaRole, MediaType, MediaTypeDetector};
pub use record::{AssetRecord, AssetView, GalleryPolicy, GallerySummary};

/// Gallery used when an upload names none.
pub const DEFAULT_GALLERY_ID: &str = "default";
/// Display name used when an upload names none.
pub const DEFAULT_GALLERY_NAME: &str = "Default Gallery";
/// Length of the id prefix used in on-disk filenames.
pub const ASSET_ID_LEN: usize = 8;

pub(crate) use file::clean_extension;
pub(crate) use record::{file_url, record_file_name};
