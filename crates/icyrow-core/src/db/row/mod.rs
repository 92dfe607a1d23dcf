mod columns;
mod load;
mod save;
#[cfg(test)]
mod tests;

use crate::{
    Error, PATH_SEPARATOR,
    db::Db,
    model::{field::FieldSpec, key::HasRowKey, row::RowModel},
    types::{ColumnName, RowKey},
    value::Value,
};
use columns::OrderedColumns;
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

pub use load::{LoadMulti, LoadOptions};

///
/// AccessMode
///
/// Internal: values arrive in external form and go through the field spec.
/// Identity: values are already stored bytes (`Value::Bytes`) and are kept as is.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AccessMode {
    #[default]
    Internal,
    Identity,
}

///
/// SaveState
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SaveState {
    #[default]
    Unsaved,
    WritingColumns,
    HooksRunning,
    Saved,
    Failed,
}

#[derive(Clone)]
enum Mirror {
    Key(RowKey),
    Deferred(Arc<dyn Fn() -> RowKey + Send + Sync>),
}

///
/// Row
///
/// One store row in memory: its key, the columns in the order they were
/// first set, their stored bytes, and which of them changed since the last
/// save. Columns are converted through the model's field specs on the way
/// in and out.
///

#[derive(Clone)]
pub struct Row {
    db: Db,
    model: Arc<RowModel>,
    row_key: Option<RowKey>,
    columns: OrderedColumns,
    values: HashMap<ColumnName, Vec<u8>>,
    changed: BTreeSet<ColumnName>,
    mirrors: Vec<Mirror>,
    state: SaveState,
    been_saved: bool,
    been_loaded: bool,
}

impl Row {
    /// Empty, unkeyed row of the named model.
    pub fn new(db: &Db, model: &str) -> Result<Self, Error> {
        Ok(Self::from_model(db, db.model(model)?, None))
    }

    pub fn with_key(db: &Db, model: &str, key: impl Into<RowKey>) -> Result<Self, Error> {
        Ok(Self::from_model(db, db.model(model)?, Some(key.into())))
    }

    pub(crate) fn from_model(db: &Db, model: Arc<RowModel>, row_key: Option<RowKey>) -> Self {
        Self {
            db: db.clone(),
            model,
            row_key,
            columns: OrderedColumns::default(),
            values: HashMap::new(),
            changed: BTreeSet::new(),
            mirrors: Vec::new(),
            state: SaveState::Unsaved,
            been_saved: false,
            been_loaded: false,
        }
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<RowModel> {
        &self.model
    }

    #[must_use]
    pub const fn row_key(&self) -> Option<&RowKey> {
        self.row_key.as_ref()
    }

    pub fn set_row_key(&mut self, key: impl Into<RowKey>) {
        self.row_key = Some(key.into());
    }

    /// Take the row key of a related row, checked against `linked_from`.
    pub fn link_to(&mut self, related: &impl HasRowKey) -> Result<(), Error> {
        let key = self
            .model
            .row_key_spec()
            .key_of(related)
            .map_err(|err| Error::type_mismatch(self.model.row_key_name(), err))?;
        self.row_key = Some(key);

        Ok(())
    }

    #[must_use]
    pub const fn save_state(&self) -> SaveState {
        self.state
    }

    #[must_use]
    pub const fn been_saved(&self) -> bool {
        self.been_saved
    }

    #[must_use]
    pub const fn been_loaded(&self) -> bool {
        self.been_loaded
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns written since the last successful save, in byte order.
    pub fn changed_columns(&self) -> impl Iterator<Item = &ColumnName> {
        self.changed.iter()
    }

    // ------------------------------------------------------------------
    // column access
    // ------------------------------------------------------------------

    /// Set columns (or the row key, by its name) from `(name, value)` pairs.
    /// All pairs are converted before any is applied.
    pub fn update<K, I>(&mut self, pairs: I, mode: AccessMode) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<ColumnName>,
    {
        let mut row_key = None;
        let mut staged = Vec::new();

        for (name, value) in pairs {
            let name = name.into();
            if name.is(self.model.row_key_name()) {
                row_key = Some(self.convert_row_key(value, mode)?);
                continue;
            }
            let bytes = self.convert_column(&name, value, mode)?;
            staged.push((name, bytes));
        }

        if row_key.is_some() {
            self.row_key = row_key;
        }
        for (name, bytes) in staged {
            self.put(name, bytes);
        }

        Ok(())
    }

    pub fn set(&mut self, name: impl Into<ColumnName>, value: impl Into<Value>) -> Result<(), Error> {
        self.update([(name.into(), value.into())], AccessMode::Internal)
    }

    /// External value of a column, or the row key when asked by its name.
    pub fn get(&self, name: impl Into<ColumnName>) -> Result<Option<Value>, Error> {
        let name = name.into();
        if name.is(self.model.row_key_name()) {
            return Ok(self.row_key.clone().map(Value::Key));
        }

        match self.values.get(&name) {
            Some(bytes) => self
                .spec(&name)?
                .to_external(bytes)
                .map(Some)
                .map_err(|err| Error::type_mismatch(&name, err)),
            None => Ok(None),
        }
    }

    #[must_use]
    pub fn get_raw(&self, name: &ColumnName) -> Option<&[u8]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Drop a column locally. Mandatory columns cannot be deleted.
    pub fn delete(&mut self, name: impl Into<ColumnName>) -> Result<bool, Error> {
        let name = name.into();
        if self
            .model
            .spec_for(&name)
            .is_some_and(FieldSpec::is_mandatory)
        {
            return Err(Error::MandatoryColumnDelete {
                model: self.model.name().to_string(),
                column: name.to_string(),
            });
        }

        self.changed.remove(&name);
        self.columns.remove(&name);

        Ok(self.values.remove(&name).is_some())
    }

    /// Mandatory columns still without a value. Defaults of missing
    /// mandatory columns are materialized along the way.
    pub fn list_missing_columns(&mut self) -> Result<Vec<String>, Error> {
        let model = Arc::clone(&self.model);
        let mut missing = Vec::new();

        for (field, spec) in model.fields() {
            let column = ColumnName::from(field);
            let present = self.values.get(&column).is_some_and(|bytes| !bytes.is_empty());
            if !spec.is_mandatory() || present {
                continue;
            }

            match spec.get_default() {
                Some(default) => {
                    let bytes = spec
                        .to_internal(default)
                        .map_err(|err| Error::type_mismatch(&column, err))?;
                    self.put(column, bytes);
                }
                None => missing.push(field.to_string()),
            }
        }

        if let Some(orphan) = self.values.keys().find(|name| !self.columns.contains(name)) {
            return Err(Error::invariant(format!(
                "column '{orphan}' of '{}' has a value but no ordered key",
                model.name()
            )));
        }

        Ok(missing)
    }

    pub fn is_complete(&mut self) -> Result<bool, Error> {
        Ok(self.list_missing_columns()?.is_empty())
    }

    /// Column names in order.
    pub fn keys(&self) -> impl Iterator<Item = &ColumnName> {
        self.columns.iter()
    }

    /// Stored bytes in column order.
    pub fn raw_values(&self) -> impl Iterator<Item = &[u8]> {
        self.columns
            .iter()
            .filter_map(|name| self.values.get(name).map(Vec::as_slice))
    }

    /// `(name, external value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = Result<(&ColumnName, Value), Error>> {
        self.columns.iter().filter_map(|name| {
            let bytes = self.values.get(name)?;
            let value = self.spec(name).and_then(|spec| {
                spec.to_external(bytes)
                    .map_err(|err| Error::type_mismatch(name, err))
            });

            Some(value.map(|value| (name, value)))
        })
    }

    pub fn values(&self) -> Result<Vec<Value>, Error> {
        self.iter().map(|entry| entry.map(|(_, value)| value)).collect()
    }

    // ------------------------------------------------------------------
    // mirrors
    // ------------------------------------------------------------------

    /// Another key that receives an identical write on every save.
    pub fn add_mirror(&mut self, key: impl Into<RowKey>) {
        let key = key.into();
        let known = self
            .mirrors
            .iter()
            .any(|mirror| matches!(mirror, Mirror::Key(existing) if *existing == key));
        if !known {
            self.mirrors.push(Mirror::Key(key));
        }
    }

    /// Mirror whose key is produced at save time.
    pub fn add_mirror_with(&mut self, f: impl Fn() -> RowKey + Send + Sync + 'static) {
        self.mirrors.push(Mirror::Deferred(Arc::new(f)));
    }

    // ------------------------------------------------------------------
    // display
    // ------------------------------------------------------------------

    /// Position of this row as `cluster/keyspace/column_family[/row_key]`.
    #[must_use]
    pub fn path(&self) -> String {
        let sep = PATH_SEPARATOR;
        let mut path = format!(
            "{}{sep}{}{sep}{}",
            self.db.config().cluster,
            self.model.keyspace(),
            self.model.column_family()
        );

        if let Some(key) = &self.row_key {
            path.push(PATH_SEPARATOR);
            path.push_str(key.as_str());
        }

        path
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn spec(&self, name: &ColumnName) -> Result<&FieldSpec, Error> {
        self.model.spec_for(name).ok_or_else(|| {
            Error::schema(format!(
                "no field spec for column '{name}' of '{}'",
                self.model.name()
            ))
        })
    }

    fn convert_row_key(&self, value: Value, mode: AccessMode) -> Result<RowKey, Error> {
        let name = self.model.row_key_name();
        if mode == AccessMode::Identity && !matches!(value, Value::Bytes(_)) {
            return Err(Error::type_mismatch(
                name,
                format!("identity access takes raw bytes, found {}", value.kind_name()),
            ));
        }

        self.model
            .row_key_spec()
            .to_internal(value)
            .map_err(|err| Error::type_mismatch(name, err))
    }

    fn convert_column(
        &self,
        name: &ColumnName,
        value: Value,
        mode: AccessMode,
    ) -> Result<Vec<u8>, Error> {
        let spec = self.spec(name)?;

        match (mode, value) {
            (AccessMode::Identity, Value::Bytes(bytes)) => Ok(bytes),
            (AccessMode::Identity, other) => Err(Error::type_mismatch(
                name,
                format!("identity access takes raw bytes, found {}", other.kind_name()),
            )),
            (AccessMode::Internal, value) => spec
                .to_internal(value)
                .map_err(|err| Error::type_mismatch(name, err)),
        }
    }

    fn put(&mut self, name: ColumnName, bytes: Vec<u8>) {
        self.columns.insert(&name);
        self.changed.insert(name.clone());
        self.values.insert(name, bytes);
    }
}

impl HasRowKey for Row {
    fn row_key(&self) -> Option<&RowKey> {
        self.row_key.as_ref()
    }

    fn model_name(&self) -> &str {
        self.model.name()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name() && self.row_key == other.row_key
    }
}

impl Eq for Row {}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} ", self.model.name())?;
        match &self.row_key {
            Some(key) => write!(f, "{key}")?,
            None => f.write_str("?")?,
        }
        f.write_str(": {")?;

        // unordered models render by column name, ordered ones keep insertion order
        let mut present: Vec<_> = self
            .columns
            .iter()
            .filter_map(|name| self.values.get(name).map(|bytes| (name, bytes)))
            .collect();
        if !self.model.is_ordered() {
            present.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        for (i, (name, bytes)) in present.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match self.model.spec_for(name) {
                Some(spec) => write!(f, "{name}: {}", spec.to_display(bytes))?,
                None => write!(f, "{name}: <{} bytes>", bytes.len())?,
            }
        }

        f.write_str("}>")
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("model", &self.model.name())
            .field("row_key", &self.row_key)
            .field("columns", &self.columns.len())
            .field("changed", &self.changed.len())
            .field("mirrors", &self.mirrors.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
