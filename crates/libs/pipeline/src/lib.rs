//! The batch renaming pipeline: scan a page of photos, match faces, review,
//! generate AI titles, review again, apply renames, advance to the next page.

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod apply;
mod batch;
mod context;
mod generate;
mod metadata;
mod references;
mod scan;

pub use batch::*;
pub use context::*;
pub use generate::TITLE_ERROR_MARKER;
pub use references::select_references;
