use crate::{
    types::{RowKey, Ulid},
    value::Value,
};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error as ThisError;

///
/// ConversionError
///
/// Raised by a field spec when a value does not belong to its domain.
/// Rows attach the column name and surface it as `Error::TypeMismatch`.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ConversionError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("stored bytes are not a valid {kind}: {reason}")]
    Undecodable { kind: &'static str, reason: String },

    #[error("row of '{found}' cannot stand in for a key of '{expected}'")]
    WrongModel { expected: String, found: String },

    #[error("row of '{model}' has no row key yet")]
    Unkeyed { model: String },
}

///
/// ColumnOrder
///
/// How the store sorts column names within a row. Appends are only
/// meaningful for time-ordered families.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ColumnOrder {
    #[default]
    Lexical,
    TimeOrdered,
}

impl ColumnOrder {
    /// Comparator name as reported by the store.
    #[must_use]
    pub const fn comparator(self) -> &'static str {
        match self {
            Self::Lexical => "BytesType",
            Self::TimeOrdered => "TimeUUIDType",
        }
    }
}

impl fmt::Display for ColumnOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => f.write_str("lexically ordered"),
            Self::TimeOrdered => f.write_str("time ordered"),
        }
    }
}

impl FromStr for ColumnOrder {
    type Err = String;

    /// Accepts bare or fully-qualified comparator class names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.rsplit('.').next().unwrap_or(s);
        match name {
            "TimeUUIDType" => Ok(Self::TimeOrdered),
            "BytesType" | "AsciiType" | "UTF8Type" => Ok(Self::Lexical),
            other => Err(format!("unsupported comparator '{other}'")),
        }
    }
}

///
/// FieldKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    /// Fallback for columns without a declaration; opaque bytes.
    Missing,
    Text,
    Bytes,
    Int,
    Bool,
    Timestamp,
    Ulid,
    /// Row key of a row of the named model.
    ForeignKey(String),
}

impl FieldKind {
    const fn label(&self) -> &'static str {
        match self {
            Self::Missing | Self::Bytes => "bytes",
            Self::Text => "text",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Ulid => "ulid",
            Self::ForeignKey(_) => "key",
        }
    }
}

///
/// FieldDefault
///

#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    fn get(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

///
/// Autoset
/// Timestamp fields the row fills in itself when saving.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Autoset {
    OnCreate,
    OnSave,
}

///
/// FieldSpec
///
/// Declarative description of one column: how its values convert between
/// external and internal form, whether it must be present, and its default.
/// Specs are frozen once their owning model is registered.
///

#[derive(Clone, Debug)]
pub struct FieldSpec {
    kind: FieldKind,
    mandatory: bool,
    default: Option<FieldDefault>,
    unique: bool,
    compare_with: ColumnOrder,
    autoset: Option<Autoset>,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            mandatory: false,
            default: None,
            unique: false,
            compare_with: ColumnOrder::Lexical,
            autoset: None,
        }
    }

    /// Spec used for columns nobody declared. Never mandatory.
    #[must_use]
    pub const fn missing() -> Self {
        Self::new(FieldKind::Missing)
    }

    #[must_use]
    pub const fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    #[must_use]
    pub const fn bytes() -> Self {
        Self::new(FieldKind::Bytes)
    }

    #[must_use]
    pub const fn int() -> Self {
        Self::new(FieldKind::Int)
    }

    #[must_use]
    pub const fn bool() -> Self {
        Self::new(FieldKind::Bool)
    }

    #[must_use]
    pub const fn timestamp() -> Self {
        Self::new(FieldKind::Timestamp)
    }

    #[must_use]
    pub const fn ulid() -> Self {
        Self::new(FieldKind::Ulid)
    }

    #[must_use]
    pub fn foreign_key(model: impl Into<String>) -> Self {
        Self::new(FieldKind::ForeignKey(model.into()))
    }

    #[must_use]
    pub const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn ordered_by(mut self, order: ColumnOrder) -> Self {
        self.compare_with = order;
        self
    }

    #[must_use]
    pub const fn autoset(mut self, autoset: Autoset) -> Self {
        self.autoset = Some(autoset);
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    #[must_use]
    pub fn with_default_fn(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(FieldDefault::Producer(Arc::new(f)));
        self
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub const fn compare_with(&self) -> ColumnOrder {
        self.compare_with
    }

    #[must_use]
    pub const fn autoset_policy(&self) -> Option<Autoset> {
        self.autoset
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Model whose row keys this field stores, if it is a foreign key.
    #[must_use]
    pub fn foreign_type(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::ForeignKey(model) => Some(model),
            _ => None,
        }
    }

    /// Evaluate the default, invoking it if it is a producer.
    #[must_use]
    pub fn get_default(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::get)
    }

    // ------------------------------------------------------------------
    // conversion
    // ------------------------------------------------------------------

    /// External value → internal (stored) bytes.
    pub fn to_internal(&self, value: Value) -> Result<Vec<u8>, ConversionError> {
        let mismatch = |value: &Value| ConversionError::Mismatch {
            expected: self.kind.label(),
            found: value.kind_name(),
        };

        let bytes = match (&self.kind, value) {
            (FieldKind::Missing | FieldKind::Bytes, Value::Bytes(b)) => b,
            (FieldKind::Missing | FieldKind::Text, Value::Text(s)) => s.into_bytes(),
            (FieldKind::Int, Value::Int(n)) | (FieldKind::Timestamp, Value::Timestamp(n)) => {
                n.to_string().into_bytes()
            }
            (FieldKind::Bool, Value::Bool(b)) => vec![if b { b'1' } else { b'0' }],
            (FieldKind::Ulid, Value::Ulid(id)) => id.to_bytes().to_vec(),
            (FieldKind::ForeignKey(_), Value::Key(key)) => key.into_string().into_bytes(),
            (FieldKind::ForeignKey(_), Value::Text(s)) => s.into_bytes(),
            (_, other) => return Err(mismatch(&other)),
        };

        Ok(bytes)
    }

    /// Internal (stored) bytes → external value.
    pub fn to_external(&self, bytes: &[u8]) -> Result<Value, ConversionError> {
        let kind = self.kind.label();
        let utf8 = || {
            std::str::from_utf8(bytes).map_err(|err| ConversionError::Undecodable {
                kind,
                reason: err.to_string(),
            })
        };
        let int = || {
            utf8()?
                .parse::<i64>()
                .map_err(|err| ConversionError::Undecodable {
                    kind,
                    reason: err.to_string(),
                })
        };

        let value = match &self.kind {
            FieldKind::Missing | FieldKind::Bytes => Value::Bytes(bytes.to_vec()),
            FieldKind::Text => Value::Text(utf8()?.to_string()),
            FieldKind::Int => Value::Int(int()?),
            FieldKind::Timestamp => Value::Timestamp(int()?),
            FieldKind::Bool => match bytes {
                b"1" => Value::Bool(true),
                b"0" => Value::Bool(false),
                _ => {
                    return Err(ConversionError::Undecodable {
                        kind,
                        reason: "expected '0' or '1'".to_string(),
                    });
                }
            },
            FieldKind::Ulid => {
                let id = Ulid::try_from_bytes(bytes).map_err(|err| ConversionError::Undecodable {
                    kind,
                    reason: err.to_string(),
                })?;
                Value::Ulid(id)
            }
            FieldKind::ForeignKey(_) => Value::Key(RowKey::from(utf8()?)),
        };

        Ok(value)
    }

    /// Check stored bytes are transportable for this field and hand them back.
    pub fn value_for_saving(&self, bytes: &[u8]) -> Result<Vec<u8>, ConversionError> {
        self.to_external(bytes)?;

        Ok(bytes.to_vec())
    }

    /// Human-readable rendering of stored bytes.
    #[must_use]
    pub fn to_display(&self, bytes: &[u8]) -> String {
        match self.to_external(bytes) {
            Ok(value) => value.to_string(),
            Err(_) => format!("<undecodable {} bytes>", bytes.len()),
        }
    }
}
