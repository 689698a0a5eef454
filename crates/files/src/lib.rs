//! Virtual path resolution and print-file metadata extraction.
//!
//! [`PathResolver`] maps RepRapFirmware-style `n:/...` virtual paths onto the
//! local filesystem using the shared machine model. [`FileInfoParser`] mines
//! slicer metadata from the head and tail of arbitrarily large print files
//! without scanning the middle, driving the G-code tokenizer forward over the
//! header and backward over the footer via [`ReverseLineReader`].

#![warn(missing_docs)]

/// Cooperative cancellation for long scans.
pub mod cancel;
/// Runtime settings and their defaults.
pub mod config;
/// Crate error type.
pub mod error;
/// Slicer-comment extraction filters.
mod filters;
/// Print-file metadata extraction.
pub mod info;
/// Virtual↔physical path resolution.
pub mod paths;
/// Backward buffered line reading.
pub mod reverse;

pub use cancel::CancellationToken;
pub use config::Settings;
pub use error::FileError;
pub use info::{FileInfoParser, ParsedFileInfo};
pub use paths::PathResolver;
pub use reverse::ReverseLineReader;
