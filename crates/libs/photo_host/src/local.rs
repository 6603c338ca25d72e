use crate::PhotoHost;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use color_eyre::eyre::{Result, eyre};
use common_types::{ImageVariant, MediaEntry, VariantKind};
use image::ImageFormat;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif", "heic"];

/// Photo host backed by a local directory tree. Item ids are paths relative
/// to the root, with `/` separators on every platform.
pub struct LocalFolderHost {
    root: PathBuf,
    extensions: HashSet<&'static str>,
}

impl LocalFolderHost {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: PHOTO_EXTENSIONS.iter().copied().collect(),
        }
    }

    fn is_photo(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(ext.to_lowercase().as_str()))
    }

    fn relative_id(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Some(id)
    }

    fn entry_for(&self, path: &Path) -> Option<MediaEntry> {
        let id = self.relative_id(path)?;
        let filename = path.file_name()?.to_string_lossy().to_string();
        let created = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(|modified| DateTime::<Local>::from(modified).naive_local());
        Some(MediaEntry {
            id: id.clone(),
            filename,
            title: None,
            variants: vec![ImageVariant {
                kind: VariantKind::FullRes,
                reference: id,
            }],
            created,
        })
    }
}

/// Decodes, downscales to fit `max` on the longest edge, re-encodes as JPEG.
fn downscale(bytes: Vec<u8>, max: u32) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(&bytes)?;
    if decoded.width() <= max && decoded.height() <= max {
        return Ok(bytes);
    }
    let resized = decoded.thumbnail(max, max);
    let mut out = Cursor::new(Vec::new());
    resized.to_rgb8().write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

#[async_trait]
impl PhotoHost for LocalFolderHost {
    async fn list_items(&self, collection: &str) -> Result<Vec<MediaEntry>> {
        let folder = if collection.is_empty() {
            self.root.clone()
        } else {
            self.root.join(collection)
        };
        if !folder.is_dir() {
            return Err(eyre!("Collection folder {:?} does not exist", folder));
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&folder)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && self.is_photo(entry.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();
        paths.sort();

        Ok(paths
            .iter()
            .filter_map(|path| self.entry_for(path))
            .collect())
    }

    async fn download(&self, reference: &str, max_dimension: Option<u32>) -> Result<Vec<u8>> {
        let bytes = fs::read(self.root.join(reference)).await?;
        match max_dimension {
            // Image decode is CPU work, keep it off the async threads.
            Some(max) => tokio::task::spawn_blocking(move || downscale(bytes, max)).await?,
            None => Ok(bytes),
        }
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        let source = self.root.join(id);
        let Some(parent) = source.parent() else {
            return Err(eyre!("Item {id} has no parent directory"));
        };
        let extension = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let target = parent.join(format!("{new_name}{extension}"));
        if target.exists() {
            warn!("Rename target {:?} already exists, skipping", target);
            return Err(eyre!("Rename target already exists"));
        }
        fs::rename(&source, &target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, bytes).expect("write");
    }

    #[tokio::test]
    async fn lists_only_photo_files_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("b.jpg"), b"b");
        touch(&dir.path().join("a.png"), b"a");
        touch(&dir.path().join("notes.txt"), b"x");
        touch(&dir.path().join("sub/c.jpeg"), b"c");

        let host = LocalFolderHost::new(dir.path());
        let entries = host.list_items("").await.expect("list");
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a.png", "b.jpg", "sub/c.jpeg"]);
        assert!(entries[0].created.is_some());
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = LocalFolderHost::new(dir.path());
        assert!(host.list_items("nope").await.is_err());
    }

    #[tokio::test]
    async fn rename_keeps_the_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("old.jpg"), b"data");

        let host = LocalFolderHost::new(dir.path());
        host.rename("old.jpg", "20240101 - Beach").await.expect("rename");
        assert!(dir.path().join("20240101 - Beach.jpg").exists());
        assert!(!dir.path().join("old.jpg").exists());
    }

    #[tokio::test]
    async fn download_without_resize_returns_raw_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("a.jpg"), b"raw-bytes");

        let host = LocalFolderHost::new(dir.path());
        let bytes = host.download("a.jpg", None).await.expect("download");
        assert_eq!(bytes, b"raw-bytes");
    }
}
