//! relq diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by every
//! stage of the compiler: error codes, source locations, and the restartable
//! versus fatal error split the driver relies on.

mod error;
mod error_code;
mod render;
mod span;

pub use error::*;
pub use error_code::*;
pub use render::*;
pub use span::*;

/// Result type for relq operations
pub type Result<T> = std::result::Result<T, RelqError>;
