//! Cached download of the IG publisher jar.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::log_status;

/// Ensure the publisher artifact exists at `cache_path`, downloading it once.
///
/// A present file is treated as valid without any network access; no checksum
/// is verified (known limitation). Otherwise the artifact is fetched with a
/// single blocking GET and written atomically (temp file, then rename).
pub fn ensure(cache_path: &Path, url: &str) -> Result<PathBuf> {
    if cache_path.exists() {
        log_status!("artifact", "Using cached {}", cache_path.display());
        return Ok(cache_path.to_path_buf());
    }

    log_status!("artifact", "Downloading {}", url);
    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .map_err(|e| Error::DownloadFailed(format!("GET {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::DownloadFailed(format!(
            "GET {} returned HTTP {}",
            url, status
        )));
    }

    let bytes = response
        .bytes()
        .map_err(|e| Error::DownloadFailed(format!("Reading {}: {}", url, e)))?;

    let parent = cache_path
        .parent()
        .ok_or_else(|| Error::Config(format!("Invalid cache path: {}", cache_path.display())))?;
    fs::create_dir_all(parent)?;

    let tmp_path = cache_path.with_extension("download");
    fs::write(&tmp_path, &bytes)?;
    fs::rename(&tmp_path, cache_path)?;

    Ok(cache_path.to_path_buf())
}
