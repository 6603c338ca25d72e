//! Photo host capability: list a collection, download image bytes, rename.
//!
//! The pipeline only ever talks to [`PhotoHost`]; the local-folder backend
//! exists so the CLI can run against a directory of photos, and the mock
//! backend scripts failures for pipeline tests.

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use local::LocalFolderHost;
#[cfg(feature = "mock")]
pub use mock::MockHost;

use async_trait::async_trait;
use color_eyre::eyre::Result;
use common_types::MediaEntry;

/// External photo collection collaborator. Implementations must be plain
/// async functions with no hidden thread affinity; any UI marshaling is the
/// caller's job.
#[async_trait]
pub trait PhotoHost: Send + Sync {
    /// Lists every item in the collection as one logical ordered list.
    /// Failure here is fatal to a pipeline run.
    async fn list_items(&self, collection: &str) -> Result<Vec<MediaEntry>>;

    /// Downloads the bytes behind a variant reference, optionally downscaled
    /// so the longest edge does not exceed `max_dimension`. Best-effort: the
    /// pipeline degrades an item to "no data" when this fails.
    async fn download(&self, reference: &str, max_dimension: Option<u32>) -> Result<Vec<u8>>;

    /// Renames one item. Failures are counted by the caller, never fatal.
    async fn rename(&self, id: &str, new_name: &str) -> Result<()>;
}
