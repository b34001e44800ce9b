use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions raised while loading a metadata blob. Anything that
/// goes wrong after a successful load degrades per record instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open file: {path}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata file too small to contain valid header")]
    MalformedHeader,

    #[error("Invalid metadata header sanity check: 0x{0:x}")]
    BadMagic(u32),

    #[error("Unexpected metadata version: {0}")]
    UnsupportedVersion(i32),

    #[error("Suspiciously high {what} count: {count}")]
    ImplausibleCounts { what: &'static str, count: i32 },
}

/// Raised from inside a deobfuscation action and caught at the top of
/// [`crate::MetadataLoader::apply_deobfuscation`], which converts it into a
/// failed [`crate::DeobfuscationResult`] without dropping earlier overrides.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("deobfuscation step failed: {0}")]
    Internal(String),
}
