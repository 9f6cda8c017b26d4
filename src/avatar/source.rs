//! Base avatar provisioning

use crate::config::AvatarSettings;
use anyhow::{anyhow, Context, Result};
use image::ImageFormat;
use tracing::info;

/// Make sure the base avatar exists on disk, downloading it if missing.
///
/// Any failure here is fatal at startup: badges cannot be rendered without a
/// base image.
pub async fn ensure_base_avatar(settings: &AvatarSettings) -> Result<()> {
    let path = &settings.base_image_path;
    if path.is_file() {
        info!("Using base avatar at {}", path.display());
        return Ok(());
    }

    if settings.download_url.is_empty() {
        return Err(anyhow!(
            "Base avatar {} is missing and no download URL is configured",
            path.display()
        ));
    }

    info!(
        "Base avatar {} not found, downloading from {}",
        path.display(),
        settings.download_url
    );
    let bytes = reqwest::get(&settings.download_url)
        .await
        .context("Failed to request base avatar")?
        .error_for_status()
        .context("Base avatar download was rejected")?
        .bytes()
        .await
        .context("Failed to read base avatar body")?;

    store_base_avatar(&bytes, path)
}

/// Decode any supported image format and store it as RGBA PNG
pub fn store_base_avatar(bytes: &[u8], path: &std::path::Path) -> Result<()> {
    let image = image::load_from_memory(bytes)
        .context("Base avatar is not a supported image")?
        .to_rgba8();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to save base avatar to {}", path.display()))?;

    info!(
        "Stored base avatar {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(())
}
