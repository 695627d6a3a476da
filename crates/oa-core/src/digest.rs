//! # Digest — 32-Byte Hash Values
//!
//! `Digest` is the single representation for every hash in the system:
//! leaf digests, combined digests, target hashes and merkle roots differ only
//! by role. Internally it is a raw `[u8; 32]`; at the string interchange
//! boundary (documents, logs) it is 64 lowercase hex chars without `0x`.
//!
//! Ordering is the lexicographic order of the raw bytes. The hash combiner
//! relies on this order to make pairwise combination commutative.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DigestError;

/// Length of every digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// A fixed-length binary hash value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap raw digest bytes.
    pub fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Render the digest as a lowercase hex string (no `0x` prefix).
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a 64-char hex string.
    ///
    /// Upper- and lowercase hex are both accepted. A `0x` prefix is not:
    /// the interchange format never carries one.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::InvalidLength` for anything but 64 chars and
    /// `DigestError::InvalidHex` for non-hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, DigestError> {
        if hex.len() != DIGEST_LEN * 2 {
            return Err(DigestError::InvalidLength(hex.len()));
        }
        // from_str_radix tolerates a leading '+', so check the alphabet first.
        if let Some(pos) = hex.bytes().position(|b| !b.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidHex {
                index: pos / 2,
                reason: "non-hex character".to_string(),
            });
        }
        let mut out = [0u8; DIGEST_LEN];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).map_err(|e| DigestError::InvalidHex {
                index: i,
                reason: e.to_string(),
            })?;
            out[i] = u8::from_str_radix(s, 16).map_err(|e| DigestError::InvalidHex {
                index: i,
                reason: e.to_string(),
            })?;
        }
        Ok(Self(out))
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

    #[test]
    fn test_hex_round_trip() {
        let d = Digest::from_hex(SAMPLE).unwrap();
        assert_eq!(d.to_hex(), SAMPLE);
        assert_eq!(d.to_string(), SAMPLE);
        assert_eq!(d.as_bytes()[0], 0x44);
    }

    #[test]
    fn test_uppercase_accepted_and_normalized() {
        let d = Digest::from_hex(&SAMPLE.to_uppercase()).unwrap();
        assert_eq!(d.to_hex(), SAMPLE);
    }

    #[test]
    fn test_prefixed_hex_rejected() {
        let prefixed = format!("0x{}", &SAMPLE[..62]);
        assert!(matches!(
            Digest::from_hex(&prefixed),
            Err(DigestError::InvalidHex { index: 0, .. })
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(Digest::from_hex("aabb"), Err(DigestError::InvalidLength(4)));
        assert!(Digest::from_hex("").is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        let bad = "zz".repeat(32);
        assert!(matches!(Digest::from_hex(&bad), Err(DigestError::InvalidHex { .. })));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let mut low = [0u8; DIGEST_LEN];
        let mut high = [0u8; DIGEST_LEN];
        low[31] = 0xff;
        high[0] = 0x01;
        assert!(Digest::new(low) < Digest::new(high));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let d = Digest::from_hex(SAMPLE).unwrap();
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json, serde_json::Value::String(SAMPLE.to_string()));
        let back: Digest = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
        assert!(serde_json::from_value::<Digest>(serde_json::json!("abc")).is_err());
    }
}
