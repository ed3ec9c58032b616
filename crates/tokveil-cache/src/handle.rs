//! Opaque handle generation.

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Generate an opaque handle of exactly `length` lowercase hex characters.
///
/// Draws `ceil(length / 2)` bytes straight from the operating system RNG, so
/// every character carries a full four bits of entropy. Odd lengths drop the
/// final nibble of the last byte.
pub fn generate_handle(length: usize) -> Result<String> {
    if length == 0 {
        return Err(Error::InvalidHandleLength(length));
    }

    let mut bytes = vec![0u8; length.div_ceil(2)];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::RandomSource(e.to_string()))?;

    let mut handle = hex::encode(bytes);
    handle.truncate(length);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exact_length() {
        for length in [1, 2, 7, 31, 32, 33, 64] {
            let handle = generate_handle(length).unwrap();
            assert_eq!(handle.len(), length);
        }
    }

    #[test]
    fn test_hex_alphabet() {
        let handle = generate_handle(256).unwrap();
        assert!(
            handle
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(
            generate_handle(0),
            Err(Error::InvalidHandleLength(0))
        ));
    }

    #[test]
    fn test_unique_over_ten_thousand() {
        let mut seen = HashSet::with_capacity(10_000);
        for _ in 0..10_000 {
            let handle = generate_handle(32).unwrap();
            assert!(seen.insert(handle), "duplicate handle generated");
        }
        assert_eq!(seen.len(), 10_000);
    }
}
