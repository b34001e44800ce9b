use crate::error::RecoveryError;
use crate::metadata::{
    FieldIndex, GlobalMetadata, MetadataToken, MethodIndex, MethodRecord, PropertyIndex,
    StringIndex, TypeDefinitionIndex, TypeRecord,
};
use crate::vlog::VerboseLog;

use super::Overrides;

fn is_vowel(byte: u8) -> bool {
    matches!(byte, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Lexical test for machine-generated identifiers.
///
/// A name is classified obfuscated when any of the following holds:
/// * it is empty,
/// * it is at most two characters long and entirely alphabetic,
/// * it contains a run of four or more lowercase vowels or four or more
///   lowercase consonants (uppercase letters and non-letters break a run),
/// * it is at least six characters long with more than 30% digits,
/// * it is at least six characters long with at least five letters and
///   more than 50% uppercase.
pub fn is_obfuscated_name(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }

    let bytes = name.as_bytes();
    if bytes.len() <= 2 && bytes.iter().all(|byte| byte.is_ascii_alphabetic()) {
        return true;
    }

    let mut vowel_run = 0;
    let mut consonant_run = 0;
    for &byte in bytes {
        if is_vowel(byte) {
            vowel_run += 1;
            consonant_run = 0;
        } else if byte.is_ascii_lowercase() {
            consonant_run += 1;
            vowel_run = 0;
        } else {
            vowel_run = 0;
            consonant_run = 0;
        }
        if vowel_run >= 4 || consonant_run >= 4 {
            return true;
        }
    }

    if bytes.len() >= 6 {
        let length = bytes.len() as f64;
        let letters = bytes.iter().filter(|byte| byte.is_ascii_alphabetic()).count();
        let digits = bytes.iter().filter(|byte| byte.is_ascii_digit()).count();
        let uppercase = bytes.iter().filter(|byte| byte.is_ascii_uppercase()).count();

        if digits as f64 / length > 0.3 {
            return true;
        }
        if letters >= 5 && uppercase as f64 / length > 0.5 {
            return true;
        }
    }

    false
}

/// Runs the four recovery passes over types, methods, fields and
/// properties. Names that already read well pass through untouched.
pub(crate) fn recover_symbols(
    metadata: &GlobalMetadata,
    overrides: &mut Overrides,
    vlog: &mut VerboseLog,
) -> Result<(), RecoveryError> {
    vlog.line("[*] Starting symbol recovery...");
    recover_type_names(metadata, overrides, vlog);
    recover_method_names(metadata, overrides, vlog);
    recover_field_names(metadata, overrides, vlog);
    recover_property_names(metadata, overrides, vlog);
    vlog.line("[+] Symbol recovery completed");
    Ok(())
}

/// Current best reading of a pool entry: the decrypted override when one
/// exists, the raw resolved string otherwise.
fn best_name(metadata: &GlobalMetadata, overrides: &Overrides, index: StringIndex) -> String {
    match overrides.strings.get(&index) {
        Some(decrypted) => decrypted.clone(),
        None => metadata.string(index).to_string(),
    }
}

fn recover_type_names(metadata: &GlobalMetadata, overrides: &mut Overrides, vlog: &mut VerboseLog) {
    let count = metadata.header().type_definitions_count.max(0) as u32;
    for i in 0..count {
        let index = TypeDefinitionIndex(i);
        let Some(record) = metadata.type_definition(index) else {
            continue;
        };
        let name = best_name(metadata, overrides, record.name_index);
        if !is_obfuscated_name(&name) {
            continue;
        }

        let token = MetadataToken::type_def(i);
        let recovered = infer_type_name(metadata, index, &record);
        vlog.line(format!(
            "[+] Recovered class name: {} for token 0x{:x}",
            recovered, token.0
        ));
        overrides.symbols.insert(token, recovered);
    }
}

fn recover_method_names(
    metadata: &GlobalMetadata,
    overrides: &mut Overrides,
    vlog: &mut VerboseLog,
) {
    let count = metadata.header().methods_count.max(0) as u32;
    for i in 0..count {
        let index = MethodIndex(i);
        let Some(record) = metadata.method(index) else {
            continue;
        };
        let name = best_name(metadata, overrides, record.name_index);
        if !is_obfuscated_name(&name) {
            continue;
        }

        let token = MetadataToken::method(i);
        let recovered = infer_method_name(metadata, index, &record);
        vlog.line(format!(
            "[+] Recovered method name: {} for token 0x{:x}",
            recovered, token.0
        ));
        overrides.symbols.insert(token, recovered);
    }
}

fn recover_field_names(
    metadata: &GlobalMetadata,
    overrides: &mut Overrides,
    vlog: &mut VerboseLog,
) {
    let count = metadata.header().fields_count.max(0) as u32;
    for i in 0..count {
        let index = FieldIndex(i);
        let Some(record) = metadata.field(index) else {
            continue;
        };
        let name = best_name(metadata, overrides, record.name_index);
        if !is_obfuscated_name(&name) {
            continue;
        }

        let token = MetadataToken::field(i);
        let recovered = format!("Field_{}", index.0);
        vlog.line(format!(
            "[+] Recovered field name: {} for token 0x{:x}",
            recovered, token.0
        ));
        overrides.symbols.insert(token, recovered);
    }
}

fn recover_property_names(
    metadata: &GlobalMetadata,
    overrides: &mut Overrides,
    vlog: &mut VerboseLog,
) {
    let count = metadata.header().properties_count.max(0) as u32;
    for i in 0..count {
        let index = PropertyIndex(i);
        let Some(record) = metadata.property(index) else {
            continue;
        };
        let name = best_name(metadata, overrides, record.name_index);
        if !is_obfuscated_name(&name) {
            continue;
        }

        let token = MetadataToken::property(i);
        let recovered = format!("Property_{}", index.0);
        vlog.line(format!(
            "[+] Recovered property name: {} for token 0x{:x}",
            recovered, token.0
        ));
        overrides.symbols.insert(token, recovered);
    }
}

/// Synthesizes a type name from parent and namespace context.
fn infer_type_name(
    metadata: &GlobalMetadata,
    index: TypeDefinitionIndex,
    record: &TypeRecord,
) -> String {
    if record.parent_index.is_valid() {
        // The parent link doubles as a string-pool key here.
        let parent = metadata.string(StringIndex(record.parent_index.0));
        if !parent.is_empty() && !is_obfuscated_name(parent) {
            if parent == "MonoBehaviour" {
                return format!("GameBehavior_{}", index.0);
            } else if parent == "ScriptableObject" {
                return format!("GameData_{}", index.0);
            } else if parent.contains("Component") {
                return format!("Component_{}", index.0);
            }
        }
    }

    let namespace = metadata.string(record.namespace_index);
    if !namespace.is_empty() {
        if namespace.contains("UI") {
            return format!("UIElement_{}", index.0);
        } else if namespace.contains("Network") {
            return format!("NetworkClass_{}", index.0);
        } else if namespace.contains("Audio") {
            return format!("AudioClass_{}", index.0);
        }
    }

    format!("Class_{}", index.0)
}

/// Synthesizes a method name from the raw name's shape.
fn infer_method_name(
    metadata: &GlobalMetadata,
    index: MethodIndex,
    record: &MethodRecord,
) -> String {
    let raw = metadata.string(record.name_index);
    if raw.starts_with("get") {
        return format!("GetValue_{}", index.0);
    }
    if raw.starts_with("set") {
        return format!("SetValue_{}", index.0);
    }

    match raw {
        ".ctor" => "Constructor".to_string(),
        ".cctor" => "StaticConstructor".to_string(),
        _ => format!("Method_{}", index.0),
    }
}
