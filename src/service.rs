use std::sync::Arc;

use tracing::info;

use crate::{
    AssetRecord, AssetView, GalleryError, GalleryRepository, GallerySummary, Result,
    UploadProcessor, UploadReceipt, UploadRequest,
};

/// Gallery passwords are share-link gates compared as case-insensitive
/// plaintext.
pub fn passwords_match(expected: &str, given: &str) -> bool {
    expected.to_lowercase() == given.to_lowercase()
}

fn provided(password: Option<&str>) -> Option<&str> {
    password.filter(|p| !p.is_empty())
}

/// Read, upload and delete operations with the galleries' password gates
/// applied on top of a [`GalleryRepository`].
pub struct GalleryService<R: GalleryRepository + ?Sized> {
    repo: Arc<R>,
    uploads: UploadProcessor,
}

impl<R: GalleryRepository + ?Sized> GalleryService<R> {
    pub fn new(repo: Arc<R>, uploads: UploadProcessor) -> Self {
        Self { repo, uploads }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn uploads(&self) -> &UploadProcessor {
        &self.uploads
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        self.uploads.process(self.repo.as_ref(), request).await
    }

    pub async fn list_galleries(&self) -> Result<Vec<GallerySummary>> {
        self.repo.list_galleries().await
    }

    /// Lists one gallery, checking its view password, or every asset when no
    /// gallery is named.
    pub async fn list_assets(
        &self,
        gallery_id: Option<&str>,
        password: Option<&str>,
    ) -> Result<Vec<AssetView>> {
        let Some(gallery_id) = gallery_id else {
            return self.repo.list_assets(None).await;
        };

        if let Some(policy) = self.repo.gallery_policy(gallery_id).await? {
            if let Some(expected) = policy.view_password.as_deref().filter(|p| !p.is_empty()) {
                let given = provided(password).ok_or(GalleryError::AuthRequired)?;
                if !passwords_match(expected, given) {
                    return Err(GalleryError::Forbidden("Incorrect password".to_string()));
                }
            }
        }

        self.repo.list_assets(Some(gallery_id)).await
    }

    pub async fn get_asset(&self, id_or_prefix: &str) -> Result<AssetView> {
        self.repo
            .find_asset(id_or_prefix)
            .await?
            .map(AssetView::from)
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id_or_prefix)))
    }

    /// The asset stored under exactly `asset_id` in `gallery_id`.
    pub async fn get_gallery_asset(&self, gallery_id: &str, asset_id: &str) -> Result<AssetView> {
        self.repo
            .read_record(gallery_id, asset_id)
            .await?
            .map(AssetView::from)
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}/{}", gallery_id, asset_id)))
    }

    pub async fn delete_asset(
        &self,
        id_or_prefix: &str,
        password: Option<&str>,
    ) -> Result<AssetRecord> {
        let given = require_password(password)?;
        let record = self
            .repo
            .find_asset(id_or_prefix)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id_or_prefix)))?;

        check_delete_password(record.gallery_delete_password.as_deref(), given)?;

        let deleted = self.repo.delete_asset(&record.id).await?;
        info!("Asset {} deleted by request", deleted.id);
        Ok(deleted)
    }

    pub async fn delete_gallery(&self, gallery_id: &str, password: Option<&str>) -> Result<usize> {
        let given = require_password(password)?;
        let policy = self
            .repo
            .gallery_policy(gallery_id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("gallery {}", gallery_id)))?;

        check_delete_password(policy.delete_password.as_deref(), given)?;

        let count = self.repo.delete_gallery(gallery_id).await?;
        info!("Gallery {} deleted by request", gallery_id);
        Ok(count)
    }
}

fn require_password(password: Option<&str>) -> Result<&str> {
    provided(password).ok_or_else(|| GalleryError::Validation("Password is required".to_string()))
}

fn check_delete_password(expected: Option<&str>, given: &str) -> Result<()> {
    match expected.filter(|p| !p.is_empty()) {
        None => Err(GalleryError::Forbidden(
            "Deletion is not enabled for this gallery".to_string(),
        )),
        Some(expected) if passwords_match(expected, given) => Ok(()),
        Some(_) => Err(GalleryError::Forbidden("Incorrect password".to_string())),
    }
}
