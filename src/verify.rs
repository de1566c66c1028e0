//! SHA-256 integrity checks for downloaded artifacts.

use sha2::{Digest, Sha256};

use crate::error::{InstallError, Result};

/// Lowercase hex SHA-256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Check `content` against an expected hex digest.
///
/// An empty `expected` skips the check entirely; whether that is acceptable is
/// decided by the caller (see `Settings::allow_unverified`). Hex case is
/// ignored.
pub fn verify_sha256(content: &[u8], expected: &str) -> Result<()> {
    let expected = expected.trim();
    if expected.is_empty() {
        return Ok(());
    }

    let actual = sha256_hex(content);
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(InstallError::Integrity {
            expected: expected.to_string(),
            actual,
        });
    }

    tracing::debug!("SHA256 verified: {}", actual);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_known_digest() {
        assert_eq!(sha256_hex(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_matching_digest_passes() {
        let data = b"engine bytes";
        verify_sha256(data, &sha256_hex(data)).unwrap();
    }

    #[test]
    fn test_uppercase_digest_passes() {
        verify_sha256(b"hello", &HELLO_SHA256.to_uppercase()).unwrap();
    }

    #[test]
    fn test_mismatch_reports_both() {
        let err = verify_sha256(b"hello", "deadbeef").unwrap_err();
        match err {
            InstallError::Integrity { expected, actual } => {
                assert_eq!(expected, "deadbeef");
                assert_eq!(actual, HELLO_SHA256);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_expected_is_noop() {
        verify_sha256(b"anything", "").unwrap();
        verify_sha256(b"anything", "   ").unwrap();
    }
}
