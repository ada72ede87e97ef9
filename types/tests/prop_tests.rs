use proptest::prelude::*;

use fedchain_types::{BlockId, PublicKey, Signature, Timestamp, TxId};

proptest! {
    /// TxId roundtrip: new -> as_bytes -> new produces identical id.
    #[test]
    fn tx_id_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        prop_assert_eq!(id.as_bytes(), &bytes);
    }

    /// TxId::is_zero is true only for all-zero bytes.
    #[test]
    fn tx_id_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        prop_assert_eq!(id.is_zero(), bytes == [0u8; 32]);
    }

    /// Display and FromStr are inverse for block ids.
    #[test]
    fn block_id_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = BlockId::new(bytes);
        let parsed: BlockId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// TxId bincode serialization roundtrip (LMDB record encoding).
    #[test]
    fn tx_id_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: TxId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Public keys survive the base58 text form.
    #[test]
    fn public_key_base58_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let pk = PublicKey(bytes);
        let parsed: PublicKey = pk.to_string().parse().unwrap();
        prop_assert_eq!(parsed, pk);
    }

    /// Signatures survive the hex text form.
    #[test]
    fn signature_hex_roundtrip(a in prop::array::uniform32(0u8..), b in prop::array::uniform32(0u8..)) {
        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(&a);
        raw[32..].copy_from_slice(&b);
        let sig = Signature(raw);
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, sig);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// minus_secs never underflows.
    #[test]
    fn timestamp_minus_saturates(a in 0u64..1_000_000, d in 0u64..2_000_000) {
        let t = Timestamp::new(a).minus_secs(d);
        prop_assert_eq!(t.as_secs(), a.saturating_sub(d));
    }
}
