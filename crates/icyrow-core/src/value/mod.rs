#[cfg(test)]
mod tests;

use crate::types::{RowKey, Ulid, timestamp::format_micros};
use std::fmt;

///
/// Value
///
/// External (application-facing) form of a column value. The store only
/// ever sees the internal byte form produced by a field spec.
///
/// Key         → a row key used as a foreign-key reference.
/// Timestamp   → microseconds since the Unix epoch.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Bool(bool),
    Bytes(Vec<u8>),
    Int(i64),
    Key(RowKey),
    Text(String),
    Timestamp(i64),
    Ulid(Ulid),
}

impl Value {
    /// Short variant label used in conversion errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Int(_) => "int",
            Self::Key(_) => "key",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Ulid(_) => "ulid",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_key(&self) -> Option<&RowKey> {
        match self {
            Self::Key(k) => Some(k),
            _ => None,
        }
    }

    /// Render this value as a row key, used when a field value addresses an
    /// index row. Byte values must be UTF-8.
    #[must_use]
    pub fn to_row_key(&self) -> Option<RowKey> {
        let key = match self {
            Self::Bool(b) => b.to_string(),
            Self::Bytes(b) => String::from_utf8(b.clone()).ok()?,
            Self::Int(n) | Self::Timestamp(n) => n.to_string(),
            Self::Key(k) => return Some(k.clone()),
            Self::Text(s) => s.clone(),
            Self::Ulid(u) => u.to_string(),
        };

        Some(RowKey::from(key))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Int(n) => write!(f, "{n}"),
            Self::Key(k) => write!(f, "->{k}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Timestamp(micros) => f.write_str(&format_micros(*micros)),
            Self::Ulid(u) => write!(f, "{u}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<RowKey> for Value {
    fn from(key: RowKey) -> Self {
        Self::Key(key)
    }
}

impl From<&RowKey> for Value {
    fn from(key: &RowKey) -> Self {
        Self::Key(key.clone())
    }
}

impl From<Ulid> for Value {
    fn from(id: Ulid) -> Self {
        Self::Ulid(id)
    }
}
