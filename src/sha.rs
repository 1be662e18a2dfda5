use std::fmt;

use crate::error::{CacheError, Result};

/// Width of a full commit identifier, in hex characters. Matches a
/// SHA-1 hex digest; the cache itself never interprets the bytes, it
/// only compares and hashes them.
pub const SHA_HEX_LEN: usize = 40;

/// An opaque, fixed-width commit identifier.
///
/// `Sha` is always fully qualified; prefix queries take a plain `&str`
/// rather than a `Sha`, since a prefix is by definition not a full id.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Sha(String);

impl Sha {
    /// The sentinel identifier for the WIP pseudo-commit.
    pub fn zero() -> Sha {
        Sha("0".repeat(SHA_HEX_LEN))
    }

    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Parses a full-width hex commit id. Rejects anything that is not
    /// exactly [`SHA_HEX_LEN`] hex digits.
    pub fn from_hex(s: &str) -> Result<Sha> {
        if s.len() != SHA_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CacheError::InvalidSha(s.to_string()));
        }
        Ok(Sha(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.to_ascii_lowercase())
    }
}

impl fmt::Debug for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha({})", self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sha {
    /// Convenience conversion for tests and fixtures: pads the given
    /// string on the right with `'0'` to the full width instead of
    /// rejecting it. Production ingest paths should use
    /// [`Sha::from_hex`] to get proper validation.
    fn from(s: &str) -> Sha {
        let mut owned = s.to_ascii_lowercase();
        while owned.len() < SHA_HEX_LEN {
            owned.push('0');
        }
        owned.truncate(SHA_HEX_LEN);
        Sha(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(Sha::zero().is_zero());
        assert_eq!(Sha::zero().as_str().len(), SHA_HEX_LEN);
    }

    #[test]
    fn from_hex_rejects_bad_width() {
        assert!(Sha::from_hex("abc").is_err());
        assert!(Sha::from_hex(&"a".repeat(SHA_HEX_LEN)).is_ok());
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let bad = format!("{}zz", "a".repeat(SHA_HEX_LEN - 2));
        assert!(Sha::from_hex(&bad).is_err());
    }

    #[test]
    fn short_fixture_strings_pad_and_compare() {
        assert_ne!(Sha::from("aaa"), Sha::from("bbb"));
        assert_eq!(Sha::from("aaa"), Sha::from("aaa"));
    }
}
