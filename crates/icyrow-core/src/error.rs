use crate::{
    config::ConfigError,
    model::field::ColumnOrder,
    store::StoreError,
    types::{RowKey, UlidError},
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Every failure surfaced by rows, index rows, the schema builder and the
/// verification path. Validation failures are raised synchronously to the
/// caller and are never swallowed; the only soft outcome in the engine is a
/// suppressed duplicate index append, which is reported as a value.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("row of '{model}' has no row key and its key spec cannot produce one")]
    MissingRowKey { model: String },

    #[error("row '{key}' of '{model}' is missing mandatory columns: {}", columns.join(", "))]
    IncompleteRow {
        model: String,
        key: RowKey,
        columns: Vec<String>,
    },

    #[error("row '{key}' not found in column family '{column_family}'")]
    RowNotFound { column_family: String, key: RowKey },

    #[error(
        "requested row '{requested}' from '{column_family}' but the store answered with '{returned}'"
    )]
    UnexpectedKey {
        column_family: String,
        requested: RowKey,
        returned: RowKey,
    },

    #[error(
        "index row '{key}' in '{column_family}' reached the uniqueness scan cap of {cap} entries"
    )]
    IndexTooLarge {
        column_family: String,
        key: RowKey,
        cap: usize,
    },

    #[error("column family '{column_family}' is {ordering}; appends need time-ordered column keys")]
    UnsupportedOrdering {
        column_family: String,
        ordering: ColumnOrder,
    },

    #[error("index '{index}' reads mandatory field '{field}' of '{model}', which is not set")]
    MandatoryIndexFieldMissing {
        index: String,
        model: String,
        field: String,
    },

    #[error("cannot delete mandatory column '{column}' of '{model}'")]
    MandatoryColumnDelete { model: String, column: String },

    #[error("type mismatch on '{column}': {message}")]
    TypeMismatch { column: String, message: String },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("store does not know column family '{column_family}' in keyspace '{keyspace}'")]
    UnknownColumnFamily {
        keyspace: String,
        column_family: String,
    },

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ulid(#[from] UlidError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    pub(crate) fn type_mismatch(column: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::TypeMismatch {
            column: column.to_string(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::RowNotFound { .. } | Self::UnknownModel(_) | Self::UnknownColumnFamily { .. } => {
                ErrorClass::NotFound
            }
            Self::UnexpectedKey { .. } => ErrorClass::Corruption,
            Self::IndexTooLarge { .. } | Self::UnsupportedOrdering { .. } => {
                ErrorClass::Unsupported
            }
            Self::SchemaMismatch(_) | Self::MandatoryColumnDelete { .. } => ErrorClass::Conflict,
            Self::Schema(_)
            | Self::MissingRowKey { .. }
            | Self::IncompleteRow { .. }
            | Self::MandatoryIndexFieldMissing { .. }
            | Self::TypeMismatch { .. }
            | Self::Invariant(_) => ErrorClass::InvariantViolation,
            Self::Store(_) | Self::Ulid(_) | Self::Config(_) => ErrorClass::Internal,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::TypeMismatch { .. } => ErrorOrigin::Field,
            Self::MissingRowKey { .. }
            | Self::IncompleteRow { .. }
            | Self::RowNotFound { .. }
            | Self::MandatoryColumnDelete { .. }
            | Self::Invariant(_) => ErrorOrigin::Row,
            Self::IndexTooLarge { .. }
            | Self::UnsupportedOrdering { .. }
            | Self::MandatoryIndexFieldMissing { .. }
            | Self::Ulid(_) => ErrorOrigin::Index,
            Self::Schema(_)
            | Self::UnknownModel(_)
            | Self::SchemaMismatch(_)
            | Self::UnknownColumnFamily { .. }
            | Self::Config(_) => ErrorOrigin::Schema,
            Self::UnexpectedKey { .. } | Self::Store(_) => ErrorOrigin::Store,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {self}", self.origin(), self.class())
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Conflict,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Field,
    Row,
    Index,
    Schema,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Field => "field",
            Self::Row => "row",
            Self::Index => "index",
            Self::Schema => "schema",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_stable_for_row_failures() {
        let err = Error::IncompleteRow {
            model: "User".to_string(),
            key: RowKey::from("u1"),
            columns: vec!["email".to_string(), "name".to_string()],
        };

        assert_eq!(err.class(), ErrorClass::InvariantViolation);
        assert_eq!(err.origin(), ErrorOrigin::Row);
        assert_eq!(
            err.to_string(),
            "row 'u1' of 'User' is missing mandatory columns: email, name"
        );
    }

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = Error::RowNotFound {
            column_family: "Users".to_string(),
            key: RowKey::from("nobody"),
        };

        assert_eq!(
            err.display_with_class(),
            "row:not_found: row 'nobody' not found in column family 'Users'"
        );
    }

    #[test]
    fn store_errors_convert_transparently() {
        let err: Error = StoreError::Unavailable("connection refused".to_string()).into();

        assert_eq!(err.origin(), ErrorOrigin::Store);
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }
}
