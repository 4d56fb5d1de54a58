//! Kiln SDK
//!
//! Shared library providing the error taxonomy and the value types that cross
//! the action dispatch boundary. Used by the engine and by anything embedding it.

/// Error types and handling
pub mod errors;

/// Action output types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use types::{ActionOutput, LinkBundle};
