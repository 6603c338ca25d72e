#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools
)]
mod batch;
mod faces;
mod media;
mod utils;

pub use batch::*;
pub use faces::*;
pub use media::*;
pub use utils::*;
