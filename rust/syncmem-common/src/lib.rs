//! Core definitions (errors and result helpers), relied upon by all syncmem-* crates.

pub mod error;
pub mod result;

pub use error::{CopyDirection, Error, ErrorKind};
pub use result::Result;
