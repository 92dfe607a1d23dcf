use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// RowKey
///
/// Opaque identifier of one row within a column family.
///

#[derive(
    Clone, Debug, Default, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for RowKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RowKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&RowKey> for RowKey {
    fn from(key: &RowKey) -> Self {
        key.clone()
    }
}

///
/// ColumnName
///
/// Column names are raw bytes in the store: declared fields use their UTF-8
/// name, index rows use generated 16-byte time-ordered keys.
/// Ordering is plain byte order, matching the store's column ordering.
///

#[derive(Clone, Debug, Default, Deref, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ColumnName(Vec<u8>);

impl ColumnName {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Column name as text, when it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Whether this column name spells the given field name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name.as_bytes()
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) if !s.chars().any(char::is_control) => f.write_str(s),
            _ => {
                f.write_str("0x")?;
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ColumnName {
    fn from(name: &str) -> Self {
        Self(name.as_bytes().to_vec())
    }
}

impl From<String> for ColumnName {
    fn from(name: String) -> Self {
        Self(name.into_bytes())
    }
}

impl From<&String> for ColumnName {
    fn from(name: &String) -> Self {
        Self(name.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for ColumnName {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ColumnName {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&ColumnName> for ColumnName {
    fn from(name: &ColumnName) -> Self {
        name.clone()
    }
}
