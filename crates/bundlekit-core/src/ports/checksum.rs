//! Checksum port.

use sha2::{Digest, Sha256};

/// Computes integrity tokens for downloaded bytes.
pub trait ChecksumPort: Send + Sync {
    /// Checksum of `bytes`.
    fn checksum(&self, bytes: &[u8]) -> String;

    /// Whether `bytes` match `expected`. Comparison ignores ASCII case.
    fn matches(&self, bytes: &[u8], expected: &str) -> bool {
        self.checksum(bytes).eq_ignore_ascii_case(expected)
    }
}

/// Lower-case hex SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksum;

impl ChecksumPort for Sha256Checksum {
    fn checksum(&self, bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            Sha256Checksum.checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(Sha256Checksum.matches(
            b"abc",
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        ));
    }
}
