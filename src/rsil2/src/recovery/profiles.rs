use std::collections::BTreeMap;

use crate::error::RecoveryError;
use crate::metadata::strings::is_printable;
use crate::metadata::{GlobalMetadata, MetadataToken, StringIndex, TypeDefinitionIndex};
use crate::vlog::VerboseLog;

use super::{decrypt, symbols};

/// How many entries of a table each detector samples.
const DETECTION_SAMPLE: u32 = 1000;

/// Recovered replacements, consulted by the emitters before the raw pool.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Decrypted strings keyed by string-pool index.
    pub strings: BTreeMap<StringIndex, String>,
    /// Recovered symbol names keyed by metadata token.
    pub symbols: BTreeMap<MetadataToken, String>,
}

/// Outcome of one full deobfuscation run. A failure never invalidates the
/// overrides collected before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeobfuscationResult {
    pub success: bool,
    pub error_message: String,
}

impl DeobfuscationResult {
    pub fn succeeded() -> DeobfuscationResult {
        DeobfuscationResult {
            success: true,
            error_message: String::new(),
        }
    }

    pub fn failed(error_message: String) -> DeobfuscationResult {
        DeobfuscationResult {
            success: false,
            error_message,
        }
    }
}

/// A known obfuscation family: a detector over bounded table samples and a
/// remediation pass that fills the override maps. The maps are handed in
/// explicitly; profiles hold no state of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    StringEncryption,
    SymbolObfuscation,
}

impl Profile {
    pub fn all() -> Vec<Profile> {
        vec![Profile::StringEncryption, Profile::SymbolObfuscation]
    }

    pub fn name(self) -> &'static str {
        match self {
            Profile::StringEncryption => "Common String Encryption",
            Profile::SymbolObfuscation => "Symbol Obfuscation",
        }
    }

    pub fn detect(self, metadata: &GlobalMetadata) -> bool {
        match self {
            Profile::StringEncryption => detect_string_encryption(metadata),
            Profile::SymbolObfuscation => detect_symbol_obfuscation(metadata),
        }
    }

    pub fn apply(
        self,
        metadata: &GlobalMetadata,
        overrides: &mut Overrides,
        vlog: &mut VerboseLog,
    ) -> Result<(), RecoveryError> {
        match self {
            Profile::StringEncryption => {
                vlog.line("[+] Applying common string decryption...");
                decrypt::decrypt_string_pool(metadata, &mut overrides.strings);
                Ok(())
            }
            Profile::SymbolObfuscation => {
                vlog.line("[+] Applying symbol recovery...");
                symbols::recover_symbols(metadata, overrides, vlog)
            }
        }
    }
}

/// Aggregate ratio of non-printable bytes across the sampled raw pool.
fn detect_string_encryption(metadata: &GlobalMetadata) -> bool {
    let mut suspicious = 0usize;
    let mut total = 0usize;

    let count = (metadata.header().string_count.max(0) as u32).min(DETECTION_SAMPLE);
    for i in 0..count {
        let bytes = metadata.raw_string_bytes(StringIndex(i));
        if bytes.is_empty() {
            continue;
        }
        for &byte in bytes {
            if !is_printable(byte) && byte != 0 {
                suspicious += 1;
            }
            total += 1;
        }
    }

    total > 0 && suspicious as f64 / total as f64 > 0.5
}

/// Proportion of sampled type names no longer than two characters.
fn detect_symbol_obfuscation(metadata: &GlobalMetadata) -> bool {
    let mut short = 0usize;
    let mut total = 0usize;

    let count = (metadata.header().type_definitions_count.max(0) as u32).min(DETECTION_SAMPLE);
    for i in 0..count {
        let Some(record) = metadata.type_definition(TypeDefinitionIndex(i)) else {
            continue;
        };
        if metadata.string(record.name_index).len() <= 2 {
            short += 1;
        }
        total += 1;
    }

    total > 0 && short as f64 / total as f64 > 0.7
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MetadataBuilder;

    #[test]
    fn clean_pools_trigger_no_detector() {
        let mut builder = MetadataBuilder::new();
        let name = builder.add_string("PlayerController");
        let namespace = builder.add_string("Game");
        builder.add_type(name, namespace);
        let metadata = builder.build_metadata();

        assert!(!Profile::StringEncryption.detect(&metadata));
        assert!(!Profile::SymbolObfuscation.detect(&metadata));
    }

    #[test]
    fn garbled_pool_triggers_the_encryption_detector() {
        let mut builder = MetadataBuilder::new();
        builder.add_raw_string(&[0x81, 0x92, 0x83, 0x94, b'a']);
        builder.add_raw_string(&[0x85, 0x96, 0x87]);
        let metadata = builder.build_metadata();

        assert!(Profile::StringEncryption.detect(&metadata));
    }

    #[test]
    fn short_type_names_trigger_the_symbol_detector() {
        let mut builder = MetadataBuilder::new();
        let namespace = builder.add_string("");
        for name in ["a", "b", "c", "d"] {
            let index = builder.add_string(name);
            builder.add_type(index, namespace);
        }
        let long = builder.add_string("WellNamedType");
        builder.add_type(long, namespace);
        let metadata = builder.build_metadata();

        // 4 of 5 short: 0.8 > 0.7.
        assert!(Profile::SymbolObfuscation.detect(&metadata));
    }

    #[test]
    fn detector_thresholds_are_strict() {
        let mut builder = MetadataBuilder::new();
        let namespace = builder.add_string("");
        // 7 short of 10: exactly 0.7 does not trigger.
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            let index = builder.add_string(name);
            builder.add_type(index, namespace);
        }
        for name in ["LongNameOne", "LongNameTwo", "LongNameThree"] {
            let index = builder.add_string(name);
            builder.add_type(index, namespace);
        }
        let metadata = builder.build_metadata();

        assert!(!Profile::SymbolObfuscation.detect(&metadata));
    }

    #[test]
    fn deobfuscation_runs_are_idempotent() {
        let mut builder = MetadataBuilder::new();
        let namespace = builder.add_string("");
        let short = builder.add_string("a");
        builder.add_type(short, namespace);
        builder.add_raw_string(&[0x85, 0x96, 0x87, 0x92]);

        let mut loader = builder.build_loader();
        loader.detect_obfuscation();
        let first = loader.apply_deobfuscation();
        assert!(first.success);
        let after_first = loader.overrides().clone();

        loader.detect_obfuscation();
        let second = loader.apply_deobfuscation();
        assert!(second.success);
        assert_eq!(loader.overrides(), &after_first);
    }
}
