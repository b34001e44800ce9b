//! Informational fingerprint scans over the companion library image.
//! Findings go to the verbose log only; nothing here feeds the emitters,
//! so a missing library never changes the output files.

use crate::recovery::Overrides;
use crate::vlog::VerboseLog;

/// Flags `mov rax, [rip+disp32]` loads followed by `jmp rax`, the usual
/// shape of a flattened-control-flow dispatcher.
pub fn find_dispatcher_patterns(data: &[u8], vlog: &mut VerboseLog) {
    if data.len() < 10 {
        return;
    }
    for i in 0..data.len() - 10 {
        if data[i] == 0x48
            && data[i + 1] == 0x8B
            && data[i + 2] == 0x05
            && data[i + 7] == 0x48
            && data[i + 8] == 0xFF
            && data[i + 9] == 0xE0
        {
            vlog.line(format!(
                "[+] Found potential dispatcher pattern at 0x{i:x}"
            ));
        }
    }
}

/// Flags dense clusters of conditional branches: more than five branch
/// opcodes each within ten bytes of the previous one.
pub fn find_switch_obfuscation(data: &[u8], vlog: &mut VerboseLog) {
    if data.len() < 2 {
        return;
    }

    let mut consecutive = 0usize;
    let mut last_branch = 0usize;
    for i in 0..data.len() - 1 {
        let is_branch = (data[i] & 0xF0) == 0x70
            || (data[i] == 0x0F && (data[i + 1] & 0xF0) == 0x80)
            || data[i] == 0xE3;
        if !is_branch {
            continue;
        }

        if last_branch == 0 || i - last_branch < 10 {
            consecutive += 1;
        } else {
            if consecutive > 5 {
                vlog.line(format!(
                    "[+] Found potential obfuscated switch with {consecutive} consecutive branches at 0x{last_branch:x}"
                ));
            }
            consecutive = 1;
        }
        last_branch = i;
    }

    if consecutive > 5 {
        vlog.line(format!(
            "[+] Found potential obfuscated switch with {consecutive} consecutive branches at 0x{last_branch:x}"
        ));
    }
}

/// Flags NOP sleds of more than five bytes.
pub fn find_junk_code(data: &[u8], vlog: &mut VerboseLog) {
    if data.len() < 16 {
        return;
    }

    let mut i = 0usize;
    while i < data.len() - 16 {
        if data[i] == 0x90 && data[i + 1] == 0x90 && data[i + 2] == 0x90 {
            let mut nops = 3;
            while i + nops < data.len() && data[i + nops] == 0x90 {
                nops += 1;
            }
            if nops > 5 {
                vlog.line(format!("[+] Found {nops} consecutive NOPs at 0x{i:x}"));
            }
            i += nops;
        } else {
            i += 1;
        }
    }
}

/// Surfaces `System.`-prefixed identifier runs embedded in the image.
pub fn find_embedded_symbols(data: &[u8], vlog: &mut VerboseLog) {
    const PATTERN: &[u8] = b"System.";

    let mut i = 0usize;
    while i + PATTERN.len() <= data.len() {
        if &data[i..i + PATTERN.len()] != PATTERN {
            i += 1;
            continue;
        }

        let mut end = i;
        while end < data.len() && is_symbol_byte(data[end]) {
            end += 1;
        }
        if let Ok(symbol) = std::str::from_utf8(&data[i..end]) {
            vlog.line(format!("[+] Found potential symbol in binary: {symbol}"));
        }
        i = end.max(i + 1);
    }
}

fn is_symbol_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'<' | b'>' | b'`')
}

/// Reports where recovered symbols of useful length show up verbatim in
/// the image.
pub fn cross_reference_symbols(data: &[u8], overrides: &Overrides, vlog: &mut VerboseLog) {
    for symbol in overrides.symbols.values().filter(|name| name.len() > 3) {
        let needle = symbol.as_bytes();
        if needle.len() > data.len() {
            continue;
        }

        let mut i = 0usize;
        while i + needle.len() <= data.len() {
            if &data[i..i + needle.len()] == needle {
                vlog.line(format!(
                    "[+] Found reference to '{symbol}' at binary offset 0x{i:x}"
                ));
                i += needle.len();
            } else {
                i += 1;
            }
        }
    }
}
