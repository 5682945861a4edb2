use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

/// Downloaded archive on disk. Removed when dropped, whether or not
/// extraction succeeded.
struct ArchiveGuard {
    path: PathBuf,
}

impl ArchiveGuard {
    fn write(path: PathBuf, bytes: &[u8]) -> Result<Self> {
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed archive {}", self.path.display()),
            Err(e) => warn!("Failed to remove archive {}: {}", self.path.display(), e),
        }
    }
}

/// File name of a download URL: its last non-empty path segment.
pub fn archive_name(url: &str) -> Result<String> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url);
    let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    // Drop the host so "http://host" alone is rejected
    let path = path.split_once('/').map(|(_, rest)| rest).unwrap_or("");

    path.rsplit('/')
        .find(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No file name in download URL: {}", url))
}

/// Save `bytes` as `dest/<archive name>`, extract every member into `dest`,
/// then delete the archive. Returns the extracted files.
pub async fn materialize(bytes: Vec<u8>, url: &str, dest: &Path) -> Result<Vec<PathBuf>> {
    let name = archive_name(url)?;
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let guard = ArchiveGuard::write(dest.join(&name), &bytes)?;
    info!("Saved {} ({} bytes)", guard.path.display(), bytes.len());

    let archive_path = guard.path.clone();
    let dest_owned = dest.to_path_buf();
    let files = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &dest_owned))
        .await
        .context("Extraction task panicked")??;

    drop(guard);
    Ok(files)
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a zip archive", archive_path.display()))?;
    extract_members(&mut archive, dest)
}

fn extract_members<R: std::io::Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    dest: &Path,
) -> Result<Vec<PathBuf>> {
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive.by_index(i).context("Failed to read zip entry")?;

        // enclosed_name rejects absolute paths and `..` components
        let Some(relative) = member.enclosed_name().map(Path::to_path_buf) else {
            warn!("Skipping zip entry with unsafe path: {}", member.name());
            continue;
        };
        let out_path = dest.join(relative);

        if member.is_dir() {
            std::fs::create_dir_all(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut out = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        std::io::copy(&mut member, &mut out)
            .with_context(|| format!("Failed to extract {}", out_path.display()))?;
        debug!("Extracted {}", out_path.display());
        extracted.push(out_path);
    }

    Ok(extracted)
}

// ── Tests ──
