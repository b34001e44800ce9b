use std::io::{self, Write};

use crate::metadata::MetadataLoader;

/// How many entries of each override map the report samples.
const SAMPLE_SIZE: usize = 10;

/// Writes the plain-text recovery report: the detection flag, the override
/// counts, and the first [`SAMPLE_SIZE`] entries of each map. The maps are
/// ordered, so "first" means lowest key.
pub fn write_report<W: Write>(loader: &MetadataLoader, out: &mut W) -> io::Result<()> {
    let overrides = loader.overrides();

    writeln!(out, "IL2CPP Deobfuscation Report")?;
    writeln!(out, "==========================")?;
    writeln!(out)?;
    writeln!(out, "Detection Results:")?;
    writeln!(
        out,
        "- Obfuscation detected: {}",
        if loader.is_obfuscated() { "Yes" } else { "No" }
    )?;
    writeln!(
        out,
        "- Number of strings decrypted: {}",
        overrides.strings.len()
    )?;
    writeln!(
        out,
        "- Number of symbols recovered: {}",
        overrides.symbols.len()
    )?;

    writeln!(out)?;
    writeln!(out, "Decrypted Strings Sample:")?;
    for (index, value) in overrides.strings.iter().take(SAMPLE_SIZE) {
        writeln!(out, "  0x{:x} -> \"{}\"", index.0, value)?;
    }

    writeln!(out)?;
    writeln!(out, "Recovered Symbols Sample:")?;
    for (token, value) in overrides.symbols.iter().take(SAMPLE_SIZE) {
        writeln!(out, "  0x{:x} -> \"{}\"", token.0, value)?;
    }

    Ok(())
}
