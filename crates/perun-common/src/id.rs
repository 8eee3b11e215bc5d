//! Asset identifier type.
//!
//! Top-level container records carry a 64-bit content identifier so the engine
//! can track an asset across re-exports. It is stored little-endian in the
//! extended container header and rendered as 16 hex digits.

use std::fmt;
use std::str::FromStr;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Error;

/// A 64-bit asset identifier carried by extended container headers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct AssetId(u64);

impl AssetId {
    /// The nil identifier (all zeros), used by compact headers.
    pub const NIL: Self = Self(0);

    /// Create an identifier from a raw value.
    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Check whether this is the nil identifier.
    #[inline]
    pub const fn is_nil(&self) -> bool {
        self.0 == 0
    }

    /// Generate a fresh identifier.
    ///
    /// Uses a linear congruential generator seeded from system time and a
    /// process-wide counter. Unique enough for asset tracking; not
    /// cryptographic.
    pub fn generate() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

        let time_seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut state = time_seed
            .wrapping_add(counter)
            .wrapping_mul(6364136223846793005);
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);

        // Avoid accidentally generating NIL.
        Self(state | 1)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(Error::InvalidAssetId(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| Error::InvalidAssetId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let id = AssetId::from_raw(0x0123_4567_89AB_CDEF);
        let text = id.to_string();
        assert_eq!(text, "0123456789abcdef");
        assert_eq!(text.parse::<AssetId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("xyz".parse::<AssetId>().is_err());
        assert!("0123".parse::<AssetId>().is_err());
    }

    #[test]
    fn test_generate_not_nil() {
        assert!(!AssetId::generate().is_nil());
        assert_ne!(AssetId::generate(), AssetId::generate());
    }
}
