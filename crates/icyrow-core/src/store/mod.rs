//! Store boundary: the narrow synchronous interface the engine calls into.
//!
//! Transport, request encoding, retries and timeouts all live behind
//! [`StoreClient`]; the engine treats each call as succeeded or failed.

mod introspect;
mod memory;

use crate::types::{ColumnName, RowKey};
use serde::Deserialize;
use std::fmt;
use thiserror::Error as ThisError;

// re-exports
pub use introspect::{ColumnFamilyDef, ColumnType, SchemaIntrospector};
pub use memory::{MemoryStore, WriteRecord};

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store request timed out")]
    Timeout,

    #[error("invalid store request: {0}")]
    InvalidRequest(String),
}

///
/// ConsistencyLevel
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Zero,
    #[default]
    One,
    Quorum,
    DcQuorum,
    DcQuorumSync,
    All,
    Any,
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Quorum => "quorum",
            Self::DcQuorum => "dc_quorum",
            Self::DcQuorumSync => "dc_quorum_sync",
            Self::All => "all",
            Self::Any => "any",
        };
        write!(f, "{label}")
    }
}

///
/// Column
/// One named value with its write timestamp (microseconds).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    pub name: ColumnName,
    pub value: Vec<u8>,
    pub timestamp: i64,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<ColumnName>, value: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            timestamp,
        }
    }
}

///
/// KeySlice
/// The columns returned for one row key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeySlice {
    pub key: RowKey,
    pub columns: Vec<Column>,
}

///
/// SliceRange
///
/// Column range for a read. Empty `start`/`finish` are unbounded. When
/// `reversed`, columns come back in descending order and `start` is the
/// upper bound.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SliceRange {
    pub start: Vec<u8>,
    pub finish: Vec<u8>,
    pub reversed: bool,
    pub count: usize,
}

impl SliceRange {
    #[must_use]
    pub const fn all(count: usize) -> Self {
        Self {
            start: Vec::new(),
            finish: Vec::new(),
            reversed: false,
            count,
        }
    }
}

///
/// SlicePredicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SlicePredicate {
    ColumnNames(Vec<ColumnName>),
    Range(SliceRange),
}

///
/// StoreClient
///
/// Batched write for a single key (atomic per key, no cross-key atomicity)
/// and batched multi-key read (one round trip, response order unspecified).
///

pub trait StoreClient: Send + Sync {
    fn batch_write(
        &self,
        keyspace: &str,
        key: &RowKey,
        column_family: &str,
        columns: &[Column],
        consistency: ConsistencyLevel,
    ) -> Result<(), StoreError>;

    fn batch_read(
        &self,
        keyspace: &str,
        keys: &[RowKey],
        column_family: &str,
        predicate: &SlicePredicate,
        consistency: ConsistencyLevel,
    ) -> Result<Vec<KeySlice>, StoreError>;
}
