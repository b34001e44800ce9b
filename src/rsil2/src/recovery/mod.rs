mod decrypt;
mod oracle;
mod profiles;
mod symbols;

pub use decrypt::{looks_encrypted, try_decrypt};
pub use oracle::{has_vocabulary, is_plausible, printable_ratio, SEED_VOCABULARY};
pub use profiles::{DeobfuscationResult, Overrides, Profile};
pub use symbols::is_obfuscated_name;
