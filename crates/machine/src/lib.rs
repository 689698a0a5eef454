//! Shared machine-model store.
//!
//! Holds the read-mostly state the command layer consults at runtime: the
//! numbered storage (drive) table and the directory table. Access goes
//! through [`ModelProvider`], which scopes every read or write to a closure
//! so no reference can outlive the lock.

#![warn(missing_docs)]

/// Model data types.
pub mod model;
/// The reader-writer scoped store.
pub mod provider;

pub use model::{Directories, DirectoryCategory, MachineModel, Storage};
pub use provider::ModelProvider;
