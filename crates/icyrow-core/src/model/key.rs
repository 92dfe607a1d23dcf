use crate::{
    model::field::ConversionError,
    types::{RowKey, Ulid, UlidError},
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// HasRowKey
///
/// Anything that identifies a stored row: rows and index rows. Lets a key
/// spec accept a row object in place of a bare key.
///

pub trait HasRowKey {
    fn row_key(&self) -> Option<&RowKey>;

    fn model_name(&self) -> &str;
}

///
/// KeyDefault
///

#[derive(Clone)]
pub enum KeyDefault {
    Key(RowKey),
    Producer(Arc<dyn Fn() -> RowKey + Send + Sync>),
}

impl fmt::Debug for KeyDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

///
/// RowKeySpec
///
/// How a model obtains the key of a row: generated on save, taken from a
/// default, or derived from a related row of the `linked_from` model.
///

#[derive(Clone, Debug, Default)]
pub struct RowKeySpec {
    autogenerate: bool,
    default: Option<KeyDefault>,
    linked_from: Option<String>,
}

impl RowKeySpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows without a key get a fresh time-ordered identifier on save.
    #[must_use]
    pub const fn autogenerate(mut self) -> Self {
        self.autogenerate = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, key: impl Into<RowKey>) -> Self {
        self.default = Some(KeyDefault::Key(key.into()));
        self
    }

    #[must_use]
    pub fn with_default_fn(mut self, f: impl Fn() -> RowKey + Send + Sync + 'static) -> Self {
        self.default = Some(KeyDefault::Producer(Arc::new(f)));
        self
    }

    #[must_use]
    pub fn linked_from(mut self, model: impl Into<String>) -> Self {
        self.linked_from = Some(model.into());
        self
    }

    #[must_use]
    pub const fn is_autogenerated(&self) -> bool {
        self.autogenerate
    }

    #[must_use]
    pub fn linked_model(&self) -> Option<&str> {
        self.linked_from.as_deref()
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub fn get_default(&self) -> Option<RowKey> {
        self.default.as_ref().map(|default| match default {
            KeyDefault::Key(key) => key.clone(),
            KeyDefault::Producer(f) => f(),
        })
    }

    /// Fresh key for an unkeyed row being saved: generated if enabled,
    /// else the default, else nothing.
    pub fn produce(&self) -> Result<Option<RowKey>, UlidError> {
        if self.autogenerate {
            return Ok(Some(RowKey::from(Ulid::try_generate()?.to_string())));
        }

        Ok(self.get_default())
    }

    /// External value → row key.
    pub fn to_internal(&self, value: Value) -> Result<RowKey, ConversionError> {
        match value {
            Value::Key(key) => Ok(key),
            Value::Text(text) => Ok(RowKey::from(text)),
            Value::Bytes(bytes) => String::from_utf8(bytes).map(RowKey::from).map_err(|err| {
                ConversionError::Undecodable {
                    kind: "key",
                    reason: err.to_string(),
                }
            }),
            other => Err(ConversionError::Mismatch {
                expected: "key",
                found: other.kind_name(),
            }),
        }
    }

    /// Key of a related row, checked against `linked_from` when set.
    pub fn key_of(&self, row: &impl HasRowKey) -> Result<RowKey, ConversionError> {
        if let Some(expected) = &self.linked_from
            && expected != row.model_name()
        {
            return Err(ConversionError::WrongModel {
                expected: expected.clone(),
                found: row.model_name().to_string(),
            });
        }

        row.row_key()
            .cloned()
            .ok_or_else(|| ConversionError::Unkeyed {
                model: row.model_name().to_string(),
            })
    }
}
