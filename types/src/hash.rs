//! Content-addressed identifiers for transactions and blocks.
//!
//! Both ids are 32-byte Blake2b digests. On the wire (JSON) they are
//! lower-case hex strings; parsing accepts either case and normalises.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}\u{2026})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != 64 {
                    return Err(TypesError::InvalidId(s.to_string()));
                }
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|_| TypesError::InvalidId(s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

content_id!(
    /// Id of a transaction: the hash of its signature-free body.
    TxId
);

content_id!(
    /// Id of a block: the hash of its body (transactions, creator, voters, timestamp).
    BlockId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_upper_case_and_normalises() {
        let upper = "18AC3E7343F016890C510E93F935261169D9E3F565436429830FAF0934F4F8E4";
        let id: TxId = upper.parse().unwrap();
        assert_eq!(id.to_string(), upper.to_lowercase());
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        let too_short = "18ac3e7343f016890c510e93f935261169d9e3f565436429830faf0934f4f8e";
        let too_long = "18ac3e7343f016890c510e93f935261169d9e3f565436429830faf0934f4f8e45";
        let non_hex = "18ac3e7343f016890c510e93f935261169d9e3f565436429830faf0934f4f8eg";
        for bad in [too_short, too_long, non_hex, ""] {
            assert!(bad.parse::<TxId>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn json_form_is_hex_string() {
        let id = BlockId::new([0xab; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: BlockId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn debug_is_abbreviated() {
        let id = TxId::new([0x01; 32]);
        assert_eq!(format!("{id:?}"), "TxId(01010101\u{2026})");
    }
}
