//! Deployment preparation: split oversized artifacts out of the publishable
//! tree.
//!
//! Web hosts reject files over a size limit, so anything above the threshold
//! is relocated into a release-assets area and the remainder is staged for
//! deployment. Every file in the published tree ends up in exactly one of the
//! two partitions; total byte count is conserved.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::log_status;

/// Partition of the published tree into deployable and relocated files.
///
/// `deployable` holds paths relative to the published tree; `oversized`
/// holds the base names now present under the assets directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SizePartition {
    pub deployable: Vec<PathBuf>,
    pub oversized: Vec<String>,
    pub deployable_bytes: u64,
    pub oversized_bytes: u64,
}

impl SizePartition {
    pub fn total_files(&self) -> usize {
        self.deployable.len() + self.oversized.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.deployable_bytes + self.oversized_bytes
    }
}

/// Stage `published_tree` for deployment.
///
/// Files larger than `threshold_bytes` are moved (not copied) into
/// `assets_dir`, keeping their base name. `packaged_artifact`, when present,
/// is always moved there regardless of size. The remaining tree is copied
/// into `deploy_dir`, merging with any pre-existing content. Git metadata is
/// not part of the publishable tree and is skipped.
pub fn prepare(
    published_tree: &Path,
    deploy_dir: &Path,
    assets_dir: &Path,
    threshold_bytes: u64,
    packaged_artifact: Option<&Path>,
) -> Result<SizePartition> {
    fs::create_dir_all(deploy_dir)?;
    fs::create_dir_all(assets_dir)?;

    let mut partition = SizePartition::default();
    relocate_oversized(published_tree, published_tree, assets_dir, threshold_bytes, &mut partition)?;
    copy_tree(published_tree, deploy_dir)?;

    if let Some(artifact) = packaged_artifact {
        if artifact.is_file() {
            let name = artifact
                .file_name()
                .ok_or_else(|| {
                    Error::Config(format!("Invalid artifact path: {}", artifact.display()))
                })?
                .to_string_lossy()
                .into_owned();
            let size = artifact.metadata()?.len();
            log_status!("deploy", "Moving packaged artifact {} to release assets", name);
            move_file(artifact, &assets_dir.join(&name))?;
            partition.oversized.push(name);
            partition.oversized_bytes += size;
        }
    }

    partition.deployable.sort();
    partition.oversized.sort();
    Ok(partition)
}

fn relocate_oversized(
    root: &Path,
    dir: &Path,
    assets_dir: &Path,
    threshold_bytes: u64,
    partition: &mut SizePartition,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.file_name().is_some_and(|n| n == ".git") {
            continue;
        }
        if path.is_dir() {
            relocate_oversized(root, &path, assets_dir, threshold_bytes, partition)?;
            continue;
        }
        if !path.is_file() {
            continue;
        }

        let size = entry.metadata()?.len();
        if size > threshold_bytes {
            let name = path
                .file_name()
                .ok_or_else(|| Error::Config(format!("Invalid path: {}", path.display())))?
                .to_string_lossy()
                .into_owned();
            log_status!(
                "deploy",
                "Moving large file {} ({:.1} MB) to release assets",
                name,
                size as f64 / 1024.0 / 1024.0
            );
            move_file(&path, &assets_dir.join(&name))?;
            partition.oversized.push(name);
            partition.oversized_bytes += size;
        } else {
            let relative = path
                .strip_prefix(root)
                .map_err(|_| Error::Config(format!("Path escapes tree: {}", path.display())))?;
            partition.deployable.push(relative.to_path_buf());
            partition.deployable_bytes += size;
        }
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, merging with existing content.
/// `.git` directories are skipped.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        if path.file_name().is_some_and(|n| n == ".git") {
            continue;
        }
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            copy_tree(&path, &target)?;
        } else if path.is_file() {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

/// Move a file, falling back to copy-and-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}
