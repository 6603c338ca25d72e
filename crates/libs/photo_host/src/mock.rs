use crate::PhotoHost;
use async_trait::async_trait;
use color_eyre::eyre::{Result, eyre};
use common_types::{ImageVariant, MediaEntry, VariantKind};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory photo host for pipeline tests: scripted entries, image bytes
/// per reference, and failure switches for listing, downloads, and renames.
/// Renames are recorded instead of touching anything.
#[derive(Default)]
pub struct MockHost {
    entries: Vec<MediaEntry>,
    images: HashMap<String, Vec<u8>>,
    fail_listing: bool,
    failing_downloads: HashSet<String>,
    failing_renames: HashSet<String>,
    renames: Mutex<Vec<(String, String)>>,
}

impl MockHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one photo whose single full-res variant reference equals its id.
    #[must_use]
    pub fn with_photo(mut self, id: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.push(MediaEntry {
            id: id.to_string(),
            filename: format!("{id}.jpg"),
            title: None,
            variants: vec![ImageVariant {
                kind: VariantKind::FullRes,
                reference: id.to_string(),
            }],
            created: None,
        });
        self.images.insert(id.to_string(), bytes.into());
        self
    }

    #[must_use]
    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    #[must_use]
    pub fn failing_download(mut self, id: &str) -> Self {
        self.failing_downloads.insert(id.to_string());
        self
    }

    #[must_use]
    pub fn failing_rename(mut self, id: &str) -> Self {
        self.failing_renames.insert(id.to_string());
        self
    }

    /// All successful renames, in commit order.
    #[must_use]
    pub fn renames(&self) -> Vec<(String, String)> {
        self.renames.lock().expect("renames lock").clone()
    }
}

#[async_trait]
impl PhotoHost for MockHost {
    async fn list_items(&self, _collection: &str) -> Result<Vec<MediaEntry>> {
        if self.fail_listing {
            return Err(eyre!("scripted listing failure"));
        }
        Ok(self.entries.clone())
    }

    async fn download(&self, reference: &str, _max_dimension: Option<u32>) -> Result<Vec<u8>> {
        if self.failing_downloads.contains(reference) {
            return Err(eyre!("scripted download failure"));
        }
        self.images
            .get(reference)
            .cloned()
            .ok_or_else(|| eyre!("no image for reference {reference}"))
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        if self.failing_renames.contains(id) {
            return Err(eyre!("scripted rename failure"));
        }
        self.renames
            .lock()
            .expect("renames lock")
            .push((id.to_string(), new_name.to_string()));
        Ok(())
    }
}
