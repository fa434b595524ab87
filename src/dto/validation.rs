//! Validation helpers for DTOs and path parameters.

use validator::ValidationError;

use crate::state::code::{CODE_ALPHABET, CODE_LENGTH, normalize_code};

/// Validates a session code typed by a user, before normalization.
///
/// # Examples
///
/// ```ignore
/// validate_session_code("abc234") // Ok - case-insensitive
/// validate_session_code("ABCDE0") // Err - `0` is not in the alphabet
/// validate_session_code("ABCDE")  // Err - too short
/// ```
pub fn validate_session_code(raw: &str) -> Result<(), ValidationError> {
    let trimmed = raw.trim();
    if trimmed.len() != CODE_LENGTH {
        let mut err = ValidationError::new("session_code_length");
        err.message = Some(
            format!(
                "Session code must be exactly {CODE_LENGTH} characters (got {})",
                trimmed.len()
            )
            .into(),
        );
        return Err(err);
    }

    if normalize_code(trimmed).is_none() {
        let mut err = ValidationError::new("session_code_format");
        err.message = Some(
            format!(
                "Session code may only contain {}",
                String::from_utf8_lossy(CODE_ALPHABET)
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_code_valid() {
        assert!(validate_session_code("ABC234").is_ok());
        assert!(validate_session_code("abc234").is_ok());
        assert!(validate_session_code(" XYZ789 ").is_ok());
    }

    #[test]
    fn test_validate_session_code_invalid_length() {
        assert!(validate_session_code("ABC23").is_err()); // too short
        assert!(validate_session_code("ABC2345").is_err()); // too long
        assert!(validate_session_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_session_code_invalid_format() {
        assert!(validate_session_code("ABCDE1").is_err()); // confusable digit
        assert!(validate_session_code("ABCDEO").is_err()); // confusable letter
        assert!(validate_session_code("ABC-23").is_err()); // punctuation
    }
}
