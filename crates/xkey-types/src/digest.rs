use std::fmt;

use serde::{Deserialize, Serialize};

/// Length in bytes of a [`KeyDigest`].
pub const DIGEST_LEN: usize = 32;

/// Fixed-length digest of one secondary key.
///
/// Digests are the ordering key of the key index. Ordering is byte-wise
/// lexicographic and two digests are equal iff their bytes are equal, so
/// variable-length key strings never have to be compared inside the index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyDigest([u8; DIGEST_LEN]);

impl KeyDigest {
    /// Wrap a pre-computed hash.
    pub const fn from_hash(hash: [u8; DIGEST_LEN]) -> Self {
        Self(hash)
    }

    /// The all-zero digest. Pooled key buckets carry it while unused.
    pub const fn zero() -> Self {
        Self([0u8; DIGEST_LEN])
    }

    /// Returns `true` if this is the all-zero digest.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; DIGEST_LEN]
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters), for log fields.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyDigest({})", self.short_hex())
    }
}

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for KeyDigest {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[u8; DIGEST_LEN]> for KeyDigest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_all_zeros() {
        let zero = KeyDigest::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.as_bytes(), &[0u8; DIGEST_LEN]);
    }

    #[test]
    fn hex_forms() {
        let digest = KeyDigest::from_hash([0xab; DIGEST_LEN]);
        assert_eq!(digest.to_hex(), "ab".repeat(DIGEST_LEN));
        assert_eq!(digest.to_string(), digest.to_hex());
        assert_eq!(digest.short_hex(), "abababab");
    }

    #[test]
    fn debug_uses_short_hex() {
        let digest = KeyDigest::from_hash([0x11; DIGEST_LEN]);
        assert_eq!(format!("{digest:?}"), "KeyDigest(11111111)");
    }

    #[test]
    fn ordering_is_bytewise() {
        let mut low = [0u8; DIGEST_LEN];
        let mut high = [0u8; DIGEST_LEN];
        low[0] = 1;
        low[31] = 0xff;
        high[0] = 2;
        assert!(KeyDigest::from(low) < KeyDigest::from(high));
    }

    proptest! {
        #[test]
        fn order_matches_slice_order(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            let da = KeyDigest::from(a);
            let db = KeyDigest::from(b);
            prop_assert_eq!(da.cmp(&db), a.as_slice().cmp(b.as_slice()));
            prop_assert_eq!(da == db, a == b);
        }
    }
}
