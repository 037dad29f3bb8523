pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use live_gallery::{DiskGallery, GalleryService, UploadProcessor};
use rocket::{Build, Rocket};
use tracing::info;

use config::Config;

/// Service type held in rocket's managed state.
pub type Gallery = GalleryService<DiskGallery>;

/// Assembles the server: JSON API, HTML views, and gallery files under
/// `/files`.
pub async fn build(config: &Config) -> live_gallery::Result<Rocket<Build>> {
    let storage = DiskGallery::new(&config.upload_dir).await?;
    let figment = config.figment(storage.temp_path());

    info!(
        "Serving galleries from {} (max file size {} bytes)",
        storage.root().display(),
        config.max_file_size
    );

    let gallery = GalleryService::new(Arc::new(storage), UploadProcessor::new(config.max_file_size));

    Ok(rocket::custom(figment)
        .manage(gallery)
        .mount("/", routes::api::routes())
        .mount("/", routes::views::routes())
        .mount("/files", routes::files::routes()))
}
