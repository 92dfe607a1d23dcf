//! Identifier and scalar types shared by models, rows, and the store boundary.

mod key;
pub mod timestamp;
mod ulid;

pub use key::{ColumnName, RowKey};
pub use ulid::{Ulid, UlidDecodeError, UlidError};
