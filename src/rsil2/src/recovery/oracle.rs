use crate::metadata::strings::is_printable;

/// Substrings whose presence is strong evidence that a candidate
/// decryption produced a real identifier, keyword or resource string.
pub const SEED_VOCABULARY: [&str; 41] = [
    "System.",
    "UnityEngine.",
    "Mono.",
    "Console.",
    "Debug.",
    "get_",
    "set_",
    "ctor",
    "cctor",
    "ToString",
    "Equals",
    "Length",
    "Count",
    "Add",
    "Remove",
    "Clear",
    "Find",
    "www.",
    "http",
    ".com",
    ".net",
    ".org",
    ".js",
    ".css",
    "json",
    "xml",
    "api.",
    "user",
    "password",
    "token",
    "class",
    "public",
    "private",
    "protected",
    "static",
    "void",
    "int",
    "string",
    "bool",
    "float",
    "double",
];

/// Share of bytes that are printable or NUL.
pub fn printable_ratio(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let printable = bytes
        .iter()
        .filter(|&&byte| is_printable(byte) || byte == 0)
        .count();
    printable as f64 / bytes.len() as f64
}

/// True when any seed-vocabulary entry appears as a byte substring.
pub fn has_vocabulary(bytes: &[u8]) -> bool {
    SEED_VOCABULARY
        .iter()
        .any(|pattern| find_subslice(bytes, pattern.as_bytes()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

fn letter_ratio(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let letters = bytes.iter().filter(|byte| byte.is_ascii_alphabetic()).count();
    letters as f64 / bytes.len() as f64
}

/// The shared acceptance predicate for candidate decryptions: at least 80%
/// printable-or-NUL, and either vocabulary-bearing or at least 40% letters.
pub fn is_plausible(bytes: &[u8]) -> bool {
    if printable_ratio(bytes) < 0.8 {
        return false;
    }
    has_vocabulary(bytes) || letter_ratio(bytes) >= 0.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_printable_ratio_is_always_rejected() {
        // 3 of 5 printable: 0.6 < 0.8, vocabulary notwithstanding.
        let bytes = [b'i', b'n', b't', 0x01, 0x02];
        assert!(printable_ratio(&bytes) < 0.8);
        assert!(!is_plausible(&bytes));
    }

    #[test]
    fn nul_counts_as_printable_for_the_ratio() {
        let bytes = [b'a', 0x00, b'b', 0x00];
        assert_eq!(printable_ratio(&bytes), 1.0);
    }

    #[test]
    fn vocabulary_match_accepts_punctuated_strings() {
        let text = b"#!$ System.Object %^&*()_+=-";
        assert!(has_vocabulary(text));
        assert!(is_plausible(text));
    }

    #[test]
    fn letter_fallback_accepts_vocabulary_free_text() {
        let text = b"HelloWorld";
        assert!(!has_vocabulary(text));
        assert!(is_plausible(text));
    }

    #[test]
    fn digits_and_punctuation_alone_are_rejected() {
        assert!(!is_plausible(b"1234-5678-90"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(!is_plausible(b""));
    }

    #[test]
    fn seed_list_is_complete() {
        assert_eq!(SEED_VOCABULARY.len(), 41);
        assert!(SEED_VOCABULARY.contains(&"UnityEngine."));
        assert!(SEED_VOCABULARY.contains(&"password"));
        assert!(SEED_VOCABULARY.contains(&"double"));
    }
}
