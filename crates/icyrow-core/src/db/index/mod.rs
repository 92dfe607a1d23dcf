mod binding;

use crate::{
    Error,
    db::{
        Db,
        row::{AccessMode, LoadMulti, LoadOptions, Row},
    },
    model::{
        field::{ColumnOrder, FieldSpec},
        key::HasRowKey,
        row::RowModel,
    },
    obs::sink::{MetricsEvent, record},
    types::{ColumnName, RowKey, Ulid},
    value::Value,
};
use derive_more::{Deref, DerefMut};
use std::sync::Arc;

pub use binding::IndexBinding;

///
/// AppendOutcome
///
/// `Duplicate` is the one soft outcome of the engine: a unique index already
/// holds the value, so nothing was added.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppendOutcome {
    Appended(ColumnName),
    Duplicate,
}

impl AppendOutcome {
    #[must_use]
    pub const fn is_appended(&self) -> bool {
        matches!(self, Self::Appended(_))
    }
}

///
/// IndexRow
///
/// Append-only row whose column names are generated time-ordered keys and
/// whose values are all described by the model's default field (usually a
/// foreign key). Appends are local until `save`.
///

#[derive(Clone, Debug, Deref, DerefMut)]
pub struct IndexRow {
    #[deref]
    #[deref_mut]
    row: Row,
    field: FieldSpec,
}

impl IndexRow {
    /// Index row of the named index model, under its default key if any.
    pub fn new(db: &Db, model: &str) -> Result<Self, Error> {
        Self::from_model(db, db.model(model)?, None)
    }

    pub fn with_key(db: &Db, model: &str, key: impl Into<RowKey>) -> Result<Self, Error> {
        Self::from_model(db, db.model(model)?, Some(key.into()))
    }

    pub(crate) fn from_model(
        db: &Db,
        model: Arc<RowModel>,
        key: Option<RowKey>,
    ) -> Result<Self, Error> {
        let Some(field) = model.default_field().filter(|_| model.is_index()).cloned() else {
            return Err(Error::schema(format!(
                "model '{}' is not an index model",
                model.name()
            )));
        };
        let key = key.or_else(|| model.row_key_spec().get_default());

        Ok(Self {
            row: Row::from_model(db, model, key),
            field,
        })
    }

    /// Spec shared by every entry.
    #[must_use]
    pub const fn field(&self) -> &FieldSpec {
        &self.field
    }

    #[must_use]
    pub fn into_row(self) -> Row {
        self.row
    }

    /// Whether `target` may be appended without creating a duplicate.
    ///
    /// Only unique time-ordered indexes check; they load the whole index row
    /// first, capped at `uniqueness_scan_cap` entries. Reaching the cap fails
    /// with `IndexTooLarge` since uniqueness can no longer be verified.
    pub fn is_unique(&mut self, target: &Value) -> Result<bool, Error> {
        if !self.field.is_unique() || self.field.compare_with() != ColumnOrder::TimeOrdered {
            return Ok(true);
        }

        let cap = self.row.db().config().uniqueness_scan_cap;
        match self.row.load_with(&LoadOptions::default().limit(cap)) {
            Ok(()) | Err(Error::RowNotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let entries = self.row.len();
        record(MetricsEvent::UniquenessScan {
            model: self.row.model().name(),
            entries: entries as u64,
        });
        if entries >= cap {
            return Err(Error::IndexTooLarge {
                column_family: self.row.model().column_family().to_string(),
                key: self.row.row_key().cloned().unwrap_or_default(),
                cap,
            });
        }

        let internal = self.to_internal(target.clone())?;

        Ok(!self.row.raw_values().any(|stored| stored == internal.as_slice()))
    }

    /// Fresh time-ordered column key.
    pub fn next_column_key(&self) -> Result<ColumnName, Error> {
        self.ensure_time_ordered()?;

        Ok(ColumnName::new(Ulid::try_generate()?.to_bytes().to_vec()))
    }

    /// Add `target` under a generated column key, unless this is a unique
    /// index that already holds it.
    pub fn append(&mut self, target: impl Into<Value>) -> Result<AppendOutcome, Error> {
        self.ensure_time_ordered()?;
        let target = target.into();

        if self.field.is_unique() && !self.is_unique(&target)? {
            record(MetricsEvent::DuplicateSuppressed {
                model: self.row.model().name(),
            });
            tracing::debug!(
                model = self.row.model().name(),
                key = ?self.row.row_key(),
                %target,
                "duplicate index entry suppressed"
            );

            return Ok(AppendOutcome::Duplicate);
        }

        let internal = self.to_internal(target)?;
        let column = self.next_column_key()?;
        self.row
            .update([(column.clone(), Value::Bytes(internal))], AccessMode::Identity)?;
        record(MetricsEvent::IndexAppend {
            model: self.row.model().name(),
        });

        Ok(AppendOutcome::Appended(column))
    }

    /// Write only the entry under `column`. Entries loaded by a uniqueness
    /// scan are already stored and stay out of the write.
    pub fn save_entry(&self, column: &ColumnName) -> Result<(), Error> {
        let bytes = self.row.get_raw(column).ok_or_else(|| {
            Error::invariant(format!(
                "index '{}' has no entry '{column}'",
                self.row.model().name()
            ))
        })?;

        let mut entry = Self::from_model(
            self.row.db(),
            Arc::clone(self.row.model()),
            self.row.row_key().cloned(),
        )?;
        entry
            .row
            .update([(column.clone(), Value::Bytes(bytes.to_vec()))], AccessMode::Identity)?;

        entry.row.save()
    }

    /// Append a saved row by its key, checking it is of the indexed model.
    pub fn append_row(&mut self, row: &impl HasRowKey) -> Result<AppendOutcome, Error> {
        if let Some(expected) = self.field.foreign_type()
            && expected != row.model_name()
        {
            return Err(Error::type_mismatch(
                self.row.model().name(),
                format!("index holds '{expected}' rows, got a '{}'", row.model_name()),
            ));
        }
        let key = row.row_key().cloned().ok_or_else(|| Error::MissingRowKey {
            model: row.model_name().to_string(),
        })?;

        self.append(Value::Key(key))
    }

    /// Load every referenced row in index order.
    pub fn resolve(&self) -> Result<LoadMulti, Error> {
        let target = self.target_model()?;
        let keys = self.target_keys()?;

        Row::load_multi(self.row.db(), target, &keys, true, &LoadOptions::default())
    }

    /// `(column key, referenced row)` pairs in index order.
    pub fn resolve_items(&self) -> Result<Vec<(ColumnName, Row)>, Error> {
        self.row
            .keys()
            .cloned()
            .zip(self.resolve()?)
            .map(|(column, row)| row.map(|row| (column, row)))
            .collect()
    }

    /// Unloaded rows carrying only the referenced keys, in index order.
    pub fn stubs(&self) -> Result<Vec<Row>, Error> {
        let model = self.row.db().model(self.target_model()?)?;

        Ok(self
            .target_keys()?
            .into_iter()
            .map(|key| Row::from_model(self.row.db(), Arc::clone(&model), Some(key)))
            .collect())
    }

    fn ensure_time_ordered(&self) -> Result<(), Error> {
        let ordering = self.field.compare_with();
        if ordering == ColumnOrder::TimeOrdered {
            return Ok(());
        }

        Err(Error::UnsupportedOrdering {
            column_family: self.row.model().column_family().to_string(),
            ordering,
        })
    }

    fn to_internal(&self, target: Value) -> Result<Vec<u8>, Error> {
        self.field
            .to_internal(target)
            .map_err(|err| Error::type_mismatch(self.row.model().name(), err))
    }

    fn target_model(&self) -> Result<&str, Error> {
        self.field.foreign_type().ok_or_else(|| {
            Error::schema(format!(
                "index '{}' does not hold foreign keys",
                self.row.model().name()
            ))
        })
    }

    fn target_keys(&self) -> Result<Vec<RowKey>, Error> {
        self.row
            .raw_values()
            .map(|bytes| {
                std::str::from_utf8(bytes).map(RowKey::from).map_err(|err| {
                    Error::type_mismatch(self.row.model().name(), err)
                })
            })
            .collect()
    }
}

impl HasRowKey for IndexRow {
    fn row_key(&self) -> Option<&RowKey> {
        self.row.row_key()
    }

    fn model_name(&self) -> &str {
        self.row.model().name()
    }
}
