//! # Content Identifiers
//!
//! A [`Cid`] is an opaque string naming an immutable blob. It is used both as
//! the cache key and as the final path segment of a gateway URL, so the only
//! validation applied is what keeps it safe in those two roles. No multihash
//! decoding is performed and returned bytes are never verified against it.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum accepted CID length in bytes.
pub const MAX_CID_LEN: usize = 256;

/// An opaque content identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

impl Cid {
    /// Create a validated CID.
    ///
    /// Leading and trailing whitespace is trimmed. The remainder must be
    /// non-empty, at most [`MAX_CID_LEN`] bytes, printable ASCII, and free of
    /// URL delimiters (`/`, `?`, `#`, `%`) and whitespace.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = s.as_ref().trim();
        let reject = |reason| ValidationError::InvalidCid {
            cid: trimmed.to_string(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(reject("empty"));
        }
        if trimmed.len() > MAX_CID_LEN {
            return Err(reject("longer than 256 bytes"));
        }
        for c in trimmed.chars() {
            if !c.is_ascii_graphic() {
                return Err(reject("contains whitespace or non-ASCII characters"));
            }
            if matches!(c, '/' | '?' | '#' | '%') {
                return Err(reject("contains a URL delimiter"));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the CID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Cid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cid {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_v0_and_v1_cids() {
        assert!(Cid::new("QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn").is_ok());
        assert!(Cid::new("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let cid = Cid::new("  QmAbc \n").unwrap();
        assert_eq!(cid.as_str(), "QmAbc");
    }

    #[test]
    fn rejects_empty() {
        assert!(Cid::new("").is_err());
        assert!(Cid::new("   ").is_err());
    }

    #[test]
    fn rejects_path_and_query_delimiters() {
        for bad in ["Qm/abc", "Qm?x=1", "Qm#frag", "Qm%2F"] {
            assert!(Cid::new(bad).is_err(), "{bad} must be rejected");
        }
    }

    #[test]
    fn rejects_inner_whitespace_and_non_ascii() {
        assert!(Cid::new("Qm abc").is_err());
        assert!(Cid::new("Qmé").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_CID_LEN + 1);
        assert!(Cid::new(long).is_err());
        assert!(Cid::new("a".repeat(MAX_CID_LEN)).is_ok());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: Cid = serde_json::from_str("\"QmAbc\"").unwrap();
        assert_eq!(ok.as_str(), "QmAbc");
        assert!(serde_json::from_str::<Cid>("\"Qm/abc\"").is_err());
    }

    #[test]
    fn parses_via_from_str() {
        let cid: Cid = "QmXyz".parse().unwrap();
        assert_eq!(cid.to_string(), "QmXyz");
    }
}
