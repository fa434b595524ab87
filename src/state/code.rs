//! Shareable session codes.

use rand::Rng;

/// Symbols used in codes; `I`, `O`, `0` and `1` are left out as easily confused.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Number of symbols in a code.
pub const CODE_LENGTH: usize = 6;

/// Draw a random code.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Normalize user input into a code, or `None` when it cannot be one.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b));
    valid.then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_the_alphabet() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(normalize_code(&code), Some(code.clone()));
        }
    }

    #[test]
    fn normalization_is_case_insensitive_and_trims() {
        assert_eq!(normalize_code("  abc234 "), Some("ABC234".into()));
    }

    #[test]
    fn confusable_symbols_and_bad_lengths_are_rejected() {
        assert_eq!(normalize_code("ABCDE0"), None);
        assert_eq!(normalize_code("ABCDEI"), None);
        assert_eq!(normalize_code("ABCDE"), None);
        assert_eq!(normalize_code("ABCDEFG"), None);
        assert_eq!(normalize_code(""), None);
    }
}
