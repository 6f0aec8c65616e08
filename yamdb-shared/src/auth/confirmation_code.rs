//! Confirmation code generation and hashing
//!
//! Codes are mailed to the user at signup and exchanged for an access token.
//! They work together with [`crate::models::confirmation_code`], which
//! stores only the hash.
//!
//! # Format
//!
//! [`CODE_LENGTH`] random base62 characters (`[A-Za-z0-9]`), roughly 95 bits
//! of entropy. Codes are case-sensitive.
//!
//! # Example
//!
//! ```
//! use yamdb_shared::auth::confirmation_code::{generate_code, hash_code, is_well_formed, CODE_LENGTH};
//!
//! let (code, hash) = generate_code();
//! assert_eq!(code.len(), CODE_LENGTH);
//! assert!(is_well_formed(&code));
//! assert_eq!(hash, hash_code(&code));
//! ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of characters in a confirmation code
pub const CODE_LENGTH: usize = 16;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a new code
///
/// # Returns
///
/// Tuple of (plaintext_code, sha256_hash)
pub fn generate_code() -> (String, String) {
    let mut rng = rand::thread_rng();
    let code: String = (0..CODE_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let hash = hash_code(&code);

    (code, hash)
}

/// Hex-encoded SHA-256 of a code (64 characters)
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Checks the shape of a submitted code before it reaches the database
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code() {
        let (code1, hash1) = generate_code();
        let (code2, hash2) = generate_code();

        assert_eq!(code1.len(), CODE_LENGTH);
        assert!(code1.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_ne!(code1, code2);
        assert_ne!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_code() {
        let hash = hash_code("abc");
        // Known SHA-256 of "abc"
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_code("abc"), hash_code("ABC"));
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("abcdEFGH12345678"));
        assert!(!is_well_formed("short"));
        assert!(!is_well_formed("abcdEFGH1234567!"));
        assert!(!is_well_formed("abcdEFGH123456789"));
        assert!(!is_well_formed(""));
    }
}
