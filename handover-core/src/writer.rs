use std::path::{Path, PathBuf};

use crate::config::{MARKUP_EXTENSION, PAGE_EXTENSION};

/// Swap a trailing markdown extension for the page extension.
///
/// Paths with any other extension are returned unchanged.
pub fn target_path(destination: &Path) -> PathBuf {
    match destination.extension() {
        Some(ext) if ext == MARKUP_EXTENSION => destination.with_extension(PAGE_EXTENSION),
        _ => destination.to_path_buf(),
    }
}

/// Write a composed page to its target, replacing whatever was there.
///
/// The parent directory must already exist. Returns the path written.
pub async fn write_page(destination: &Path, page: &str) -> std::io::Result<PathBuf> {
    let target = target_path(destination);
    tokio::fs::write(&target, page).await?;
    Ok(target)
}
