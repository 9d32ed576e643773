use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Width of the identifier space in bits (SHA-1 output width).
pub const KEY_BITS: usize = 160;

/// Identifier length in bytes.
pub const ID_LEN: usize = 20;

/// A position on the ring: a nonnegative integer modulo 2^160, stored
/// big-endian so the derived `Ord` is numeric order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id([u8; ID_LEN]);

impl Id {
    /// SHA-1 of the raw bytes. Addresses and keys both land here.
    pub fn hash(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        Id(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Id(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// The ring position finger entry `fingerentry` should cover:
    /// `(id + 2^(fingerentry-1)) mod 2^160`. Entries are 1-based.
    pub fn jump(&self, fingerentry: usize) -> Id {
        debug_assert!((1..=KEY_BITS).contains(&fingerentry));
        let offset = BigUint::from(1u8) << (fingerentry - 1);
        let sum = BigUint::from_bytes_be(&self.0) + offset;
        let wrapped = sum % (BigUint::from(1u8) << KEY_BITS);
        let bytes = wrapped.to_bytes_be();
        let mut out = [0u8; ID_LEN];
        out[ID_LEN - bytes.len()..].copy_from_slice(&bytes);
        Id(out)
    }
}

/// True iff `x` lies on the arc running clockwise from `start` to `end`.
/// The arc is always exclusive at `start`; `inclusive_end` closes it at
/// `end`. When the arc wraps past zero the test splits into the two legs on
/// either side of the wrap. `start == end` denotes the full circle minus
/// `start` itself.
pub fn between(start: &Id, x: &Id, end: &Id, inclusive_end: bool) -> bool {
    if end > start {
        (start < x && x < end) || (inclusive_end && x == end)
    } else {
        start < x || x < end || (inclusive_end && x == end)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..", &hex::encode(self.0)[..8])
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", hex::encode(self.0))
    }
}
