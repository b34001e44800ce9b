//! Reader and analyzer for IL2CPP `global-metadata.dat` blobs: parses the
//! record tables, recovers encrypted strings and obfuscated symbols, and
//! emits a pseudo-source dump plus a machine-readable index.

pub mod dump;
mod error;
mod metadata;
mod recovery;
mod scan;
mod vlog;

pub use error::{LoadError, RecoveryError};
pub use metadata::*;
pub use recovery::*;
pub use vlog::VerboseLog;

#[cfg(test)]
pub(crate) mod testutil;
