//! G-code command layer.
//!
//! Turns a raw RepRapFirmware-style G-code text stream into strongly-typed
//! [`Code`] records. The main entry points are [`Tokenizer`] for pull-based
//! parsing into a caller-owned [`Code`], and [`split_codes`] for iterating
//! over all codes in a string.

#![warn(missing_docs)]

/// Parsed command records: code kinds, keywords, and flags.
pub mod code;
/// Letter-tagged parameter values and their coercions.
pub mod parameter;
/// Iterator façade over the tokenizer.
pub mod splitter;
/// The pull-based code tokenizer.
pub mod tokenizer;

// ── Convenience re-exports ──────────────────────────────────────────────────

pub use code::{Code, CodeFlags, CodeKind, Keyword};
pub use parameter::{DriverId, Parameter, TypeMismatch};
pub use splitter::{CodeStream, split_codes};
pub use tokenizer::{ParseError, Tokenizer};
