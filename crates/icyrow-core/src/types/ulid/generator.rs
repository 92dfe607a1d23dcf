use super::{Ulid, UlidError};
use crate::types::timestamp::now_millis;
use std::sync::{LazyLock, Mutex};
use ulid::Ulid as WrappedUlid;

///
/// GENERATOR is lazily initiated with a Mutex
/// it has to keep state to make sure key order is maintained
///

static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::default()));

/// Generate a ULID using the global monotonic generator.
pub(super) fn generate() -> Result<Ulid, UlidError> {
    let mut generator = GENERATOR
        .lock()
        .map_err(|_| UlidError::GeneratorPoisoned)?;

    generator.generate()
}

///
/// Generator
///
/// Keeps the last issued id so that ids issued within the same millisecond
/// (or after the wall clock stepped back) still sort after it.
///

#[derive(Default)]
pub struct Generator {
    previous: Ulid,
}

impl Generator {
    /// Monotonic ULID generation; increments within the same millisecond.
    pub fn generate(&mut self) -> Result<Ulid, UlidError> {
        let last_ts = self.previous.timestamp_ms();
        let ts = now_millis();

        // maybe time went backward, or it is the same ms.
        // increment instead of generating a new random so that it is monotonic
        if ts <= last_ts {
            let next = self
                .previous
                .increment()
                .ok_or(UlidError::GeneratorOverflow)?;
            self.previous = next;

            return Ok(next);
        }

        let ulid = Ulid::from_parts(ts, WrappedUlid::new().random());
        self.previous = ulid;

        Ok(ulid)
    }
}
