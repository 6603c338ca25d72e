use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Named image derivative sizes a photo host may offer, best first.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    FullRes,
    Display,
    Thumbnail,
}

/// One downloadable rendition of a photo. The reference is an opaque handle
/// the photo host knows how to resolve.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageVariant {
    pub kind: VariantKind,
    pub reference: String,
}

/// One entry from the host's collection listing.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaEntry {
    pub id: String,
    pub filename: String,
    pub title: Option<String>,
    pub variants: Vec<ImageVariant>,
    /// Creation date as reported by the host, if any.
    pub created: Option<NaiveDateTime>,
}

impl MediaEntry {
    /// Picks the first available variant from an ordered preference list.
    #[must_use]
    pub fn best_variant(&self, preference: &[VariantKind]) -> Option<&ImageVariant> {
        preference
            .iter()
            .find_map(|kind| self.variants.iter().find(|v| v.kind == *kind))
    }

    /// The filename without its extension, used as the `{original}` naming token.
    #[must_use]
    pub fn file_stem(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map_or(self.filename.as_str(), |(stem, _)| stem)
    }
}
