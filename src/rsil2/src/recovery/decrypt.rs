use std::collections::BTreeMap;

use crate::metadata::strings::is_printable;
use crate::metadata::{GlobalMetadata, StringIndex};

use super::oracle;

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// True when enough of the raw bytes are non-printable for the entry to be
/// worth a trial decryption: strictly more than 30% outside printable
/// ASCII, NULs excluded.
pub fn looks_encrypted(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let suspicious = bytes
        .iter()
        .filter(|&&byte| !is_printable(byte) && byte != 0)
        .count();
    suspicious as f64 > bytes.len() as f64 * 0.3
}

/// Runs the transform ladder in fixed order; the first candidate the
/// plausibility oracle accepts wins.
pub fn try_decrypt(bytes: &[u8]) -> Option<String> {
    try_xor(bytes)
        .or_else(|| try_caesar(bytes))
        .or_else(|| try_base64(bytes))
        .or_else(|| try_rot13(bytes))
        .or_else(|| try_reverse(bytes))
}

/// Walks the whole string pool and records every successful trial in the
/// override map, keyed by string-pool index. Entries that fail every
/// transform are left alone; readers fall back to the raw string.
pub(crate) fn decrypt_string_pool(
    metadata: &GlobalMetadata,
    strings: &mut BTreeMap<StringIndex, String>,
) {
    let count = metadata.header().string_count.max(0) as u32;
    for i in 0..count {
        let index = StringIndex(i);
        let raw = metadata.raw_string_bytes(index);
        if raw.is_empty() || !looks_encrypted(raw) {
            continue;
        }
        if let Some(decrypted) = try_decrypt(raw) {
            strings.insert(index, decrypted);
        }
    }
}

fn accept(candidate: Vec<u8>) -> Option<String> {
    if oracle::is_plausible(&candidate) {
        String::from_utf8(candidate).ok()
    } else {
        None
    }
}

fn try_xor(bytes: &[u8]) -> Option<String> {
    for key in 1..=255u8 {
        let candidate: Vec<u8> = bytes
            .iter()
            .map(|&byte| if byte != 0 { byte ^ key } else { byte })
            .collect();
        if let Some(text) = accept(candidate) {
            return Some(text);
        }
    }
    None
}

/// Rotates an ASCII letter forward by `shift`, preserving case; everything
/// else passes through.
fn shift_letter(byte: u8, shift: u8) -> u8 {
    if byte.is_ascii_lowercase() {
        b'a' + (byte - b'a' + shift) % 26
    } else if byte.is_ascii_uppercase() {
        b'A' + (byte - b'A' + shift) % 26
    } else {
        byte
    }
}

fn try_caesar(bytes: &[u8]) -> Option<String> {
    for shift in 1..=25u8 {
        let candidate: Vec<u8> = bytes
            .iter()
            .map(|&byte| shift_letter(byte, 26 - shift))
            .collect();
        if let Some(text) = accept(candidate) {
            return Some(text);
        }
    }
    None
}

fn try_base64(bytes: &[u8]) -> Option<String> {
    let alphabet_only = bytes
        .iter()
        .all(|&byte| byte == b'=' || BASE64_ALPHABET.contains(&byte));
    if !alphabet_only {
        return None;
    }
    accept(base64_decode(bytes))
}

fn try_rot13(bytes: &[u8]) -> Option<String> {
    let candidate: Vec<u8> = bytes.iter().map(|&byte| shift_letter(byte, 13)).collect();
    accept(candidate)
}

fn try_reverse(bytes: &[u8]) -> Option<String> {
    let mut candidate = bytes.to_vec();
    candidate.reverse();
    accept(candidate)
}

/// Streaming 6-bit decode. Stops at the first `=` or at any byte outside
/// the alphabet.
fn base64_decode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    let mut accumulator: u32 = 0;
    let mut bits: i32 = -8;

    for &byte in input {
        if byte == b'=' {
            break;
        }
        let Some(position) = BASE64_ALPHABET.iter().position(|&c| c == byte) else {
            break;
        };
        accumulator = (accumulator << 6) | position as u32;
        bits += 6;
        if bits >= 0 {
            output.push((accumulator >> bits) as u8);
            bits -= 8;
        }
    }

    output
}
