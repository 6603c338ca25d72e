#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod matcher;
mod store;

pub use matcher::*;
pub use store::*;
