//! Core runtime for IcyRow: typed row models over a sparse wide-column store,
//! change-tracked rows, and the append-only index rows kept in step with them.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod store;
pub mod types;
pub mod value;

pub use error::Error;

///
/// CONSTANTS
///

/// Path separator used when rendering a row's position (`cluster/keyspace/cf/key`).
pub const PATH_SEPARATOR: char = '/';

/// Prefix of the column family synthesized for each bound index.
pub const AUTO_INDEX_PREFIX: &str = "Auto";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No stores, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{AccessMode, AppendOutcome, Db, IndexRow, LoadOptions, Row, SaveHook, SaveState},
        model::{
            field::{Autoset, ColumnOrder, FieldKind, FieldSpec},
            index::IndexDeclaration,
            key::RowKeySpec,
            row::RowModel,
        },
        store::ConsistencyLevel,
        types::{ColumnName, RowKey, Ulid},
        value::Value,
    };
}
