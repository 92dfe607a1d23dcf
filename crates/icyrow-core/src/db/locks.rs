use crate::types::RowKey;
use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::{Mutex, MutexGuard, PoisonError},
};

const STRIPES: usize = 64;

///
/// IndexLocks
///
/// A fixed set of in-process mutexes; each (column family, index row key)
/// hashes onto one of them. Holding one serializes check-append-save on that
/// index row within this process only; other processes can still race the
/// uniqueness check. Unrelated rows may share a stripe.
///

#[derive(Debug)]
pub(crate) struct IndexLocks {
    stripes: Box<[Mutex<()>]>,
}

impl Default for IndexLocks {
    fn default() -> Self {
        Self {
            stripes: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }
}

impl IndexLocks {
    pub(crate) fn stripe(&self, column_family: &str, key: &RowKey) -> usize {
        let mut hasher = DefaultHasher::new();
        column_family.hash(&mut hasher);
        key.hash(&mut hasher);

        // the modulus keeps the value below STRIPES, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        let stripe = (hasher.finish() % self.stripes.len() as u64) as usize;

        stripe
    }

    /// Take the lock for one index row, recovering it if a previous holder
    /// panicked.
    pub(crate) fn lock(&self, column_family: &str, key: &RowKey) -> MutexGuard<'_, ()> {
        acquire(&self.stripes[self.stripe(column_family, key)])
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.stripes.len()
    }
}

// the mutex only guards (), so a poisoned guard is still usable
fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
