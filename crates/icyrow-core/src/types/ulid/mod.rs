mod generator;

use derive_more::{Deref, Display};
use thiserror::Error as ThisError;
use ulid::Ulid as WrappedUlid;

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum UlidError {
    #[error("invalid ulid string")]
    InvalidString,

    #[error("monotonic error - overflow")]
    GeneratorOverflow,

    #[error("ulid generator lock poisoned")]
    GeneratorPoisoned,
}

///
/// UlidDecodeError
///

#[derive(Debug, ThisError)]
pub enum UlidDecodeError {
    #[error("invalid ulid length: {len} bytes")]
    InvalidSize { len: usize },
}

///
/// Ulid
///
/// Time-ordered unique identifier. The big-endian byte form sorts in
/// creation order, which is what index column keys rely on.
///

#[derive(Clone, Copy, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Ulid(WrappedUlid);

impl Ulid {
    pub const STORED_SIZE: usize = 16;

    #[must_use]
    pub const fn nil() -> Self {
        Self(WrappedUlid::nil())
    }

    #[must_use]
    pub const fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(WrappedUlid::from_parts(timestamp_ms, random))
    }

    /// try_generate
    /// Monotonic generation through the process-wide generator.
    pub fn try_generate() -> Result<Self, UlidError> {
        generator::generate()
    }

    #[must_use]
    /// Monotonic increment; returns `None` on overflow.
    pub fn increment(&self) -> Option<Self> {
        self.0.increment().map(Self)
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(WrappedUlid::from_bytes(bytes))
    }

    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, UlidDecodeError> {
        let array: [u8; 16] = bytes
            .try_into()
            .map_err(|_| UlidDecodeError::InvalidSize { len: bytes.len() })?;

        Ok(Self::from_bytes(array))
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// parse
    pub fn parse(encoded: &str) -> Result<Self, UlidError> {
        let this = WrappedUlid::from_string(encoded).map_err(|_| UlidError::InvalidString)?;

        Ok(Self(this))
    }
}

impl Default for Ulid {
    fn default() -> Self {
        Self::nil()
    }
}

impl From<WrappedUlid> for Ulid {
    fn from(wrapped: WrappedUlid) -> Self {
        Self(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn string_round_trip() {
        let id = Ulid::try_generate().unwrap();
        let parsed = Ulid::parse(&id.to_string()).unwrap();

        assert_eq!(id, parsed);
        assert!(matches!(Ulid::parse("nope"), Err(UlidError::InvalidString)));
    }

    #[test]
    fn try_from_bytes_rejects_wrong_length() {
        let err = Ulid::try_from_bytes(&[0u8; 15]).unwrap_err();

        assert!(matches!(err, UlidDecodeError::InvalidSize { len: 15 }));
    }

    proptest! {
        #[test]
        fn generated_bytes_sort_in_generation_order(count in 2usize..64) {
            let ids: Vec<Ulid> = (0..count).map(|_| Ulid::try_generate().unwrap()).collect();

            for pair in ids.windows(2) {
                prop_assert!(pair[0].to_bytes() < pair[1].to_bytes());
            }
        }
    }
}
