use crate::{model::field::ColumnOrder, store::StoreError};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

///
/// ColumnType
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColumnType {
    #[default]
    Standard,
    Super,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("Standard"),
            Self::Super => f.write_str("Super"),
        }
    }
}

///
/// ColumnFamilyDef
/// What the live store reports for one column family.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnFamilyDef {
    pub column_type: ColumnType,
    pub compare_with: ColumnOrder,
}

impl ColumnFamilyDef {
    #[must_use]
    pub const fn new(column_type: ColumnType, compare_with: ColumnOrder) -> Self {
        Self {
            column_type,
            compare_with,
        }
    }

    /// Standard (non-super) column family sorted by `compare_with`.
    #[must_use]
    pub const fn standard(compare_with: ColumnOrder) -> Self {
        Self::new(ColumnType::Standard, compare_with)
    }
}

///
/// SchemaIntrospector
/// Optional collaborator used only by schema verification.
///

pub trait SchemaIntrospector: Send + Sync {
    fn describe_keyspaces(&self) -> Result<BTreeSet<String>, StoreError>;

    fn describe_column_families(
        &self,
        keyspace: &str,
    ) -> Result<BTreeMap<String, ColumnFamilyDef>, StoreError>;

    fn add_keyspace(&self, keyspace: &str) -> Result<(), StoreError>;
}
