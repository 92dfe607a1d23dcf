use crate::{
    Error,
    config::Config,
    db::{
        Db,
        row::{AccessMode, Row},
    },
    model::row::RowModel,
    obs::sink::{MetricsEvent, record},
    store::{Column, ConsistencyLevel, KeySlice, SlicePredicate, SliceRange},
    types::{ColumnName, RowKey},
    value::Value,
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    slice,
    sync::Arc,
    vec,
};

///
/// LoadOptions
///
/// Column selection for a read: either named columns, or a range bounded by
/// `start`/`finish` (empty means unbounded) capped at `limit` columns.
/// Without a limit the configured `slice_limit` applies.
///

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    start: Vec<u8>,
    finish: Vec<u8>,
    reversed: bool,
    limit: Option<usize>,
    columns: Option<Vec<ColumnName>>,
    consistency: Option<ConsistencyLevel>,
}

impl LoadOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn range(mut self, start: impl Into<Vec<u8>>, finish: impl Into<Vec<u8>>) -> Self {
        self.start = start.into();
        self.finish = finish.into();
        self
    }

    /// Newest-first for time-ordered rows; `start` becomes the upper bound.
    #[must_use]
    pub const fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn columns<I, K>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ColumnName>,
    {
        self.columns = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = Some(level);
        self
    }

    pub(crate) fn predicate(&self, config: &Config) -> SlicePredicate {
        if let Some(columns) = &self.columns {
            return SlicePredicate::ColumnNames(columns.clone());
        }

        SlicePredicate::Range(SliceRange {
            start: self.start.clone(),
            finish: self.finish.clone(),
            reversed: self.reversed,
            count: self.limit.unwrap_or(config.slice_limit),
        })
    }
}

///
/// LoadMulti
///
/// Rows produced from one batched read, built as they are pulled.
///

#[derive(Debug)]
pub struct LoadMulti {
    db: Db,
    model: Arc<RowModel>,
    slices: vec::IntoIter<KeySlice>,
}

impl LoadMulti {
    fn new(db: &Db, model: Arc<RowModel>, slices: Vec<KeySlice>) -> Self {
        Self {
            db: db.clone(),
            model,
            slices: slices.into_iter(),
        }
    }
}

impl Iterator for LoadMulti {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let slice = self.slices.next()?;

        Some(Row::from_slice(&self.db, Arc::clone(&self.model), slice))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slices.size_hint()
    }
}

impl ExactSizeIterator for LoadMulti {}

impl Row {
    pub fn load(&mut self) -> Result<(), Error> {
        self.load_with(&LoadOptions::default())
    }

    /// Replace local columns with a fresh read of this row's key.
    pub fn load_with(&mut self, options: &LoadOptions) -> Result<(), Error> {
        let key = self.resolve_load_key()?;
        let model = Arc::clone(&self.model);

        let mut slices = read_slices(&self.db, &model, slice::from_ref(&key), options)?;
        record(MetricsEvent::Load {
            model: model.name(),
            keys: 1,
            rows: slices.len() as u64,
        });

        if let Some(stray) = slices.iter().find(|slice| slice.key != key) {
            return Err(Error::UnexpectedKey {
                column_family: model.column_family().to_string(),
                requested: key,
                returned: stray.key.clone(),
            });
        }
        let Some(slice) = slices.pop() else {
            return Err(Error::RowNotFound {
                column_family: model.column_family().to_string(),
                key,
            });
        };

        let count = slice.columns.len();
        self.apply_columns(slice.columns)?;
        self.been_loaded = true;
        tracing::debug!(model = model.name(), key = %key, columns = count, "row loaded");

        Ok(())
    }

    /// Load, then resolve every stored value as a foreign key, in column order.
    pub fn load_subkeys(&mut self, options: &LoadOptions) -> Result<Vec<Self>, Error> {
        self.load_with(options)?;

        self.resolve_references()
    }

    /// One batched read for many keys of a model.
    ///
    /// When `ordered`, rows follow `keys` exactly (duplicates included) and a
    /// key the store did not return fails the whole call. Otherwise rows come
    /// in response order.
    pub fn load_multi(
        db: &Db,
        model: &str,
        keys: &[RowKey],
        ordered: bool,
        options: &LoadOptions,
    ) -> Result<LoadMulti, Error> {
        let model = db.model(model)?;
        if keys.is_empty() {
            return Ok(LoadMulti::new(db, model, Vec::new()));
        }

        let slices = read_slices(db, &model, keys, options)?;
        record(MetricsEvent::Load {
            model: model.name(),
            keys: keys.len() as u64,
            rows: slices.len() as u64,
        });

        let requested: HashSet<&RowKey> = keys.iter().collect();
        if let Some(stray) = slices.iter().find(|slice| !requested.contains(&slice.key)) {
            let requested = keys
                .iter()
                .map(RowKey::as_str)
                .collect::<Vec<_>>()
                .join(",");

            return Err(Error::UnexpectedKey {
                column_family: model.column_family().to_string(),
                requested: RowKey::from(requested),
                returned: stray.key.clone(),
            });
        }

        if !ordered {
            return Ok(LoadMulti::new(db, model, slices));
        }

        let by_key: HashMap<&RowKey, &KeySlice> =
            slices.iter().map(|slice| (&slice.key, slice)).collect();
        let ordered = keys
            .iter()
            .map(|key| {
                by_key
                    .get(key)
                    .map(|slice| (*slice).clone())
                    .ok_or_else(|| Error::RowNotFound {
                        column_family: model.column_family().to_string(),
                        key: key.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LoadMulti::new(db, model, ordered))
    }

    pub(crate) fn from_slice(
        db: &Db,
        model: Arc<RowModel>,
        slice: KeySlice,
    ) -> Result<Self, Error> {
        let mut row = Self::from_model(db, model, Some(slice.key));
        row.apply_columns(slice.columns)?;
        row.been_loaded = true;

        Ok(row)
    }

    fn resolve_load_key(&mut self) -> Result<RowKey, Error> {
        if let Some(key) = self.row_key.as_ref().filter(|key| !key.is_empty()) {
            return Ok(key.clone());
        }

        let key = self
            .model
            .row_key_spec()
            .get_default()
            .ok_or_else(|| Error::MissingRowKey {
                model: self.model.name().to_string(),
            })?;
        self.row_key = Some(key.clone());

        Ok(key)
    }

    fn apply_columns(&mut self, columns: Vec<Column>) -> Result<(), Error> {
        let pairs = columns
            .into_iter()
            .map(|column| (column.name, Value::Bytes(column.value)));

        self.update(pairs, AccessMode::Identity)
    }

    // Foreign rows referenced by this row's values, batched per target model.
    fn resolve_references(&self) -> Result<Vec<Self>, Error> {
        let mut references = Vec::with_capacity(self.len());
        for (name, bytes) in self.columns.iter().filter_map(|name| {
            self.values.get(name).map(|bytes| (name, bytes))
        }) {
            let spec = self.spec(name)?;
            let Some(target) = spec.foreign_type() else {
                return Err(Error::type_mismatch(name, "column is not a foreign key"));
            };
            let key = spec
                .to_external(bytes)
                .map_err(|err| Error::type_mismatch(name, err))?
                .to_row_key()
                .ok_or_else(|| Error::type_mismatch(name, "value is not a row key"))?;
            references.push((target.to_string(), key));
        }

        let mut batches: BTreeMap<&str, Vec<RowKey>> = BTreeMap::new();
        for (target, key) in &references {
            batches.entry(target.as_str()).or_default().push(key.clone());
        }

        let mut loaded = HashMap::new();
        for (target, keys) in batches {
            for row in Self::load_multi(&self.db, target, &keys, false, &LoadOptions::default())? {
                let row = row?;
                if let Some(key) = row.row_key.clone() {
                    loaded.insert((target.to_string(), key), row);
                }
            }
        }

        references
            .into_iter()
            .map(|(target, key)| {
                let column_family = self.db.model(&target)?.column_family().to_string();
                loaded
                    .get(&(target, key.clone()))
                    .cloned()
                    .ok_or(Error::RowNotFound { column_family, key })
            })
            .collect()
    }
}

// Rows without columns do not exist in a wide-column store, so empty
// slices are dropped here.
fn read_slices(
    db: &Db,
    model: &RowModel,
    keys: &[RowKey],
    options: &LoadOptions,
) -> Result<Vec<KeySlice>, Error> {
    let predicate = options.predicate(db.config());
    let consistency = options.consistency.unwrap_or(model.read_consistency());
    let slices = db.client().batch_read(
        model.keyspace(),
        keys,
        model.column_family(),
        &predicate,
        consistency,
    )?;

    Ok(slices
        .into_iter()
        .filter(|slice| !slice.columns.is_empty())
        .collect())
}
