use std::path::{Path, PathBuf};
use tokio::fs;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::types::record_file_name;
use crate::{AssetRecord, AssetView, GalleryError, GalleryPolicy, GallerySummary, Result};

use super::TEMP_DIR_NAME;

const RECORD_SUFFIX: &str = "_metadata.json";

/// Storage of galleries and their assets.
///
/// Every read re-scans the backing store; implementations keep no cache.
#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn ensure_root(&self) -> Result<()>;
    async fn list_galleries(&self) -> Result<Vec<GallerySummary>>;
    async fn list_assets(&self, gallery_id: Option<&str>) -> Result<Vec<AssetView>>;
    /// First asset whose id equals or starts with `id_or_prefix`.
    async fn find_asset(&self, id_or_prefix: &str) -> Result<Option<AssetRecord>>;
    /// The record stored under exactly `asset_id` in one gallery.
    async fn read_record(&self, gallery_id: &str, asset_id: &str) -> Result<Option<AssetRecord>>;
    /// Name and passwords of a gallery, read from its first record.
    async fn gallery_policy(&self, gallery_id: &str) -> Result<Option<GalleryPolicy>>;
    async fn delete_asset(&self, id_or_prefix: &str) -> Result<AssetRecord>;
    /// Removes the gallery directory and returns how many assets it held.
    async fn delete_gallery(&self, gallery_id: &str) -> Result<usize>;

    async fn create_gallery_dir(&self, gallery_id: &str) -> Result<()>;
    async fn write_media(&self, gallery_id: &str, file_name: &str, data: &[u8]) -> Result<u64>;
    async fn write_record(&self, record: &AssetRecord) -> Result<()>;
    async fn remove_media(&self, gallery_id: &str, file_name: &str) -> Result<()>;
}

/// Filesystem-backed gallery store: one directory per gallery, one JSON
/// record per asset next to its two media files.
pub struct DiskGallery {
    root: PathBuf,
    temp_path: PathBuf,
}

impl DiskGallery {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_owned();
        let temp_path = root.join(TEMP_DIR_NAME);
        let storage = Self { root, temp_path };
        storage.ensure_root().await?;
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    fn gallery_path(&self, gallery_id: &str) -> Result<PathBuf> {
        validate_segment(gallery_id, "gallery id")?;
        Ok(self.root.join(gallery_id))
    }

    /// Path of a file inside a gallery, after validating both names.
    pub fn file_path(&self, gallery_id: &str, file_name: &str) -> Result<PathBuf> {
        validate_segment(file_name, "file name")?;
        Ok(self.gallery_path(gallery_id)?.join(file_name))
    }

    /// Gallery directories sorted by name. Dot-directories (including the
    /// temp directory) are not galleries.
    async fn gallery_dirs(&self) -> Result<Vec<String>> {
        let mut galleries = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(galleries),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    galleries.push(name.to_string());
                }
            }
        }

        galleries.sort();
        Ok(galleries)
    }

    /// Records of one gallery in filename order. A missing directory has no
    /// records; an unreadable record is skipped.
    async fn read_records(&self, gallery_dir: &Path) -> Result<Vec<AssetRecord>> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(gallery_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(RECORD_SUFFIX) && entry.file_type().await?.is_file() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let path = gallery_dir.join(&name);
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                // Deleted between listing and reading.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_str::<AssetRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        debug!("Scanned {} records in {}", records.len(), gallery_dir.display());
        Ok(records)
    }

    async fn remove_if_present(path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File already missing: {}", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl GalleryRepository for DiskGallery {
    async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(&self.temp_path).await?;
        Ok(())
    }

    async fn list_galleries(&self) -> Result<Vec<GallerySummary>> {
        let mut galleries = Vec::new();

        for gallery_id in self.gallery_dirs().await? {
            let records = self.read_records(&self.root.join(&gallery_id)).await?;
            let (Some(first), Some(last_updated)) =
                (records.first(), records.iter().map(|r| r.upload_date).max())
            else {
                continue;
            };

            galleries.push(GallerySummary {
                name: first.gallery_name.clone(),
                is_protected: first.policy().requires_view_password(),
                photo_count: records.len(),
                last_updated,
                id: gallery_id,
            });
        }

        galleries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(galleries)
    }

    async fn list_assets(&self, gallery_id: Option<&str>) -> Result<Vec<AssetView>> {
        let gallery_ids = match gallery_id {
            Some(id) => {
                validate_segment(id, "gallery id")?;
                vec![id.to_string()]
            }
            None => self.gallery_dirs().await?,
        };

        let mut assets = Vec::new();
        for id in gallery_ids {
            let records = self.read_records(&self.root.join(&id)).await?;
            assets.extend(records.into_iter().map(AssetView::from));
        }

        assets.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(assets)
    }

    async fn find_asset(&self, id_or_prefix: &str) -> Result<Option<AssetRecord>> {
        if id_or_prefix.is_empty() {
            return Err(GalleryError::Validation("Asset id is required".to_string()));
        }

        for gallery_id in self.gallery_dirs().await? {
            let records = self.read_records(&self.root.join(&gallery_id)).await?;
            if let Some(record) = records.into_iter().find(|r| r.id.starts_with(id_or_prefix)) {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    async fn read_record(&self, gallery_id: &str, asset_id: &str) -> Result<Option<AssetRecord>> {
        let path = self.file_path(gallery_id, &record_file_name(asset_id))?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<AssetRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Skipping unreadable record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn gallery_policy(&self, gallery_id: &str) -> Result<Option<GalleryPolicy>> {
        let dir = self.gallery_path(gallery_id)?;
        let records = self.read_records(&dir).await?;
        Ok(records.first().map(AssetRecord::policy))
    }

    async fn delete_asset(&self, id_or_prefix: &str) -> Result<AssetRecord> {
        let record = self
            .find_asset(id_or_prefix)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id_or_prefix)))?;

        let dir = self.root.join(&record.gallery_id);
        Self::remove_if_present(&dir.join(&record.photo_file)).await?;
        Self::remove_if_present(&dir.join(&record.video_file)).await?;

        match fs::remove_file(dir.join(record.record_file_name())).await {
            Ok(()) => {}
            // A concurrent delete got there first.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GalleryError::NotFound(format!("asset {}", id_or_prefix)));
            }
            Err(e) => return Err(e.into()),
        }

        info!("Deleted asset {} from gallery {}", record.id, record.gallery_id);
        Ok(record)
    }

    async fn delete_gallery(&self, gallery_id: &str) -> Result<usize> {
        let dir = self.gallery_path(gallery_id)?;
        let not_found = || GalleryError::NotFound(format!("gallery {}", gallery_id));

        if !fs::try_exists(&dir).await? {
            return Err(not_found());
        }
        let asset_count = self.read_records(&dir).await?.len();
        if asset_count == 0 {
            return Err(not_found());
        }

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                Self::remove_if_present(&entry.path()).await?;
            }
        }
        fs::remove_dir_all(&dir).await?;

        info!("Deleted gallery {} with {} assets", gallery_id, asset_count);
        Ok(asset_count)
    }

    async fn create_gallery_dir(&self, gallery_id: &str) -> Result<()> {
        fs::create_dir_all(self.gallery_path(gallery_id)?).await?;
        Ok(())
    }

    async fn write_media(&self, gallery_id: &str, file_name: &str, data: &[u8]) -> Result<u64> {
        fs::write(self.file_path(gallery_id, file_name)?, data).await?;
        Ok(data.len() as u64)
    }

    async fn write_record(&self, record: &AssetRecord) -> Result<()> {
        let path = self.file_path(&record.gallery_id, &record_file_name(&record.id))?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(path, json).await?;
        Ok(())
    }

    async fn remove_media(&self, gallery_id: &str, file_name: &str) -> Result<()> {
        Self::remove_if_present(&self.file_path(gallery_id, file_name)?).await
    }
}

/// Rejects names that could address anything outside a single directory
/// level below the root.
pub(crate) fn validate_segment(name: &str, what: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(GalleryError::Validation(format!("Invalid {}: {:?}", what, name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_that_escape_are_rejected() {
        assert!(validate_segment("holiday-2024", "gallery id").is_ok());
        assert!(validate_segment("", "gallery id").is_err());
        assert!(validate_segment("..", "gallery id").is_err());
        assert!(validate_segment(".temp", "gallery id").is_err());
        assert!(validate_segment("a/b", "gallery id").is_err());
        assert!(validate_segment("a\\b", "gallery id").is_err());
    }
}
