use crate::{
    store::{
        Column, ColumnFamilyDef, ConsistencyLevel, KeySlice, SchemaIntrospector,
        SlicePredicate, SliceRange, StoreClient, StoreError,
    },
    types::{ColumnName, RowKey},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
};

type ColumnMap = BTreeMap<ColumnName, (Vec<u8>, i64)>;
type FamilyKey = (String, String);

///
/// WriteRecord
/// One `batch_write` call as seen by the memory store.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteRecord {
    pub keyspace: String,
    pub key: RowKey,
    pub column_family: String,
    pub columns: Vec<Column>,
    pub consistency: ConsistencyLevel,
}

#[derive(Default)]
struct MemoryState {
    rows: BTreeMap<FamilyKey, BTreeMap<RowKey, ColumnMap>>,
    keyspaces: BTreeSet<String>,
    column_families: BTreeMap<String, BTreeMap<String, ColumnFamilyDef>>,
    writes: Vec<WriteRecord>,
    reads: usize,
}

///
/// MemoryStore
///
/// In-process store with wide-column semantics: rows hold columns sorted by
/// byte order, the newest write timestamp wins per column, and multi-key
/// reads answer in key order rather than request order.
///

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Declare a column family (and its keyspace) for schema introspection.
    pub fn define_column_family(
        &self,
        keyspace: &str,
        column_family: &str,
        def: ColumnFamilyDef,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.keyspaces.insert(keyspace.to_string());
        state
            .column_families
            .entry(keyspace.to_string())
            .or_default()
            .insert(column_family.to_string(), def);

        Ok(())
    }

    /// Every `batch_write` call received so far, in arrival order.
    pub fn write_log(&self) -> Result<Vec<WriteRecord>, StoreError> {
        Ok(self.lock()?.writes.clone())
    }

    /// Number of `batch_read` calls received so far.
    pub fn read_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.reads)
    }

    pub fn clear_logs(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.writes.clear();
        state.reads = 0;

        Ok(())
    }

    /// Stored columns of one row in column order, if the row exists.
    pub fn row(
        &self,
        keyspace: &str,
        column_family: &str,
        key: &RowKey,
    ) -> Result<Option<Vec<Column>>, StoreError> {
        let state = self.lock()?;
        let family = (keyspace.to_string(), column_family.to_string());

        Ok(state
            .rows
            .get(&family)
            .and_then(|rows| rows.get(key))
            .map(|columns| {
                slice_columns(columns, &SlicePredicate::Range(SliceRange::all(usize::MAX)))
            }))
    }
}

impl StoreClient for MemoryStore {
    fn batch_write(
        &self,
        keyspace: &str,
        key: &RowKey,
        column_family: &str,
        columns: &[Column],
        consistency: ConsistencyLevel,
    ) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidRequest("empty row key".to_string()));
        }

        let mut state = self.lock()?;
        let row = state
            .rows
            .entry((keyspace.to_string(), column_family.to_string()))
            .or_default()
            .entry(key.clone())
            .or_default();

        for column in columns {
            let newer = row
                .get(&column.name)
                .is_none_or(|(_, existing)| column.timestamp >= *existing);
            if newer {
                row.insert(
                    column.name.clone(),
                    (column.value.clone(), column.timestamp),
                );
            }
        }

        state.writes.push(WriteRecord {
            keyspace: keyspace.to_string(),
            key: key.clone(),
            column_family: column_family.to_string(),
            columns: columns.to_vec(),
            consistency,
        });

        Ok(())
    }

    fn batch_read(
        &self,
        keyspace: &str,
        keys: &[RowKey],
        column_family: &str,
        predicate: &SlicePredicate,
        _consistency: ConsistencyLevel,
    ) -> Result<Vec<KeySlice>, StoreError> {
        let mut state = self.lock()?;
        state.reads = state.reads.saturating_add(1);

        let family = (keyspace.to_string(), column_family.to_string());
        let Some(rows) = state.rows.get(&family) else {
            return Ok(Vec::new());
        };

        let requested: BTreeSet<&RowKey> = keys.iter().collect();
        let slices = requested
            .into_iter()
            .filter_map(|key| {
                rows.get(key).map(|columns| KeySlice {
                    key: key.clone(),
                    columns: slice_columns(columns, predicate),
                })
            })
            .collect();

        Ok(slices)
    }
}

impl SchemaIntrospector for MemoryStore {
    fn describe_keyspaces(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.lock()?.keyspaces.clone())
    }

    fn describe_column_families(
        &self,
        keyspace: &str,
    ) -> Result<BTreeMap<String, ColumnFamilyDef>, StoreError> {
        Ok(self
            .lock()?
            .column_families
            .get(keyspace)
            .cloned()
            .unwrap_or_default())
    }

    fn add_keyspace(&self, keyspace: &str) -> Result<(), StoreError> {
        self.lock()?.keyspaces.insert(keyspace.to_string());

        Ok(())
    }
}

// Apply a slice predicate to one stored row.
fn slice_columns(columns: &ColumnMap, predicate: &SlicePredicate) -> Vec<Column> {
    let to_column = |(name, (value, timestamp)): (&ColumnName, &(Vec<u8>, i64))| Column {
        name: name.clone(),
        value: value.clone(),
        timestamp: *timestamp,
    };

    match predicate {
        SlicePredicate::ColumnNames(names) => names
            .iter()
            .filter_map(|name| columns.get_key_value(name).map(to_column))
            .collect(),
        SlicePredicate::Range(range) => {
            let within = |entry: &(&ColumnName, &(Vec<u8>, i64))| in_range(entry.0, range);
            if range.reversed {
                columns
                    .iter()
                    .rev()
                    .filter(within)
                    .take(range.count)
                    .map(to_column)
                    .collect()
            } else {
                columns
                    .iter()
                    .filter(within)
                    .take(range.count)
                    .map(to_column)
                    .collect()
            }
        }
    }
}

fn in_range(name: &[u8], range: &SliceRange) -> bool {
    let (low, high) = if range.reversed {
        (&range.finish, &range.start)
    } else {
        (&range.start, &range.finish)
    };

    (low.is_empty() || name >= low.as_slice()) && (high.is_empty() || name <= high.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::field::ColumnOrder, store::ColumnType};

    fn write(store: &MemoryStore, key: &str, columns: &[(&str, &str, i64)]) {
        let columns: Vec<Column> = columns
            .iter()
            .map(|(name, value, ts)| Column::new(*name, value.as_bytes(), *ts))
            .collect();
        store
            .batch_write("ks", &RowKey::from(key), "cf", &columns, ConsistencyLevel::One)
            .unwrap();
    }

    fn read(store: &MemoryStore, keys: &[&str], predicate: &SlicePredicate) -> Vec<KeySlice> {
        let keys: Vec<RowKey> = keys.iter().copied().map(RowKey::from).collect();
        store
            .batch_read("ks", &keys, "cf", predicate, ConsistencyLevel::One)
            .unwrap()
    }

    #[test]
    fn newest_timestamp_wins() {
        let store = MemoryStore::new();
        write(&store, "r", &[("a", "new", 20)]);
        write(&store, "r", &[("a", "old", 10)]);

        let slices = read(&store, &["r"], &SlicePredicate::Range(SliceRange::all(10)));
        assert_eq!(slices[0].columns[0].value, b"new".to_vec());
    }

    #[test]
    fn multi_read_answers_in_key_order_and_skips_missing_rows() {
        let store = MemoryStore::new();
        write(&store, "b", &[("x", "1", 1)]);
        write(&store, "a", &[("x", "2", 1)]);

        let slices = read(&store, &["b", "zzz", "a"], &SlicePredicate::Range(SliceRange::all(10)));
        let keys: Vec<&str> = slices.iter().map(|s| s.key.as_str()).collect();

        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn range_predicates_bound_and_reverse() {
        let store = MemoryStore::new();
        write(
            &store,
            "r",
            &[("a", "1", 1), ("b", "2", 1), ("c", "3", 1), ("d", "4", 1)],
        );

        let forward = SliceRange {
            start: b"b".to_vec(),
            finish: b"c".to_vec(),
            reversed: false,
            count: 10,
        };
        let names = |slices: Vec<KeySlice>| -> Vec<String> {
            slices[0].columns.iter().map(|c| c.name.to_string()).collect()
        };
        assert_eq!(names(read(&store, &["r"], &SlicePredicate::Range(forward))), ["b", "c"]);

        let reversed = SliceRange {
            start: b"c".to_vec(),
            finish: Vec::new(),
            reversed: true,
            count: 2,
        };
        assert_eq!(names(read(&store, &["r"], &SlicePredicate::Range(reversed))), ["c", "b"]);

        let picked = SlicePredicate::ColumnNames(vec!["d".into(), "nope".into(), "a".into()]);
        assert_eq!(names(read(&store, &["r"], &picked)), ["d", "a"]);
    }

    #[test]
    fn logs_writes_and_reads() {
        let store = MemoryStore::new();
        write(&store, "r", &[("a", "1", 1)]);
        read(&store, &["r"], &SlicePredicate::Range(SliceRange::all(1)));

        assert_eq!(store.write_log().unwrap().len(), 1);
        assert_eq!(store.read_count().unwrap(), 1);

        store.clear_logs().unwrap();
        assert!(store.write_log().unwrap().is_empty());
    }

    #[test]
    fn introspection_reports_defined_families() {
        let store = MemoryStore::new();
        store
            .define_column_family("ks", "Users", ColumnFamilyDef::standard(ColumnOrder::Lexical))
            .unwrap();
        store.add_keyspace("other").unwrap();

        let keyspaces = store.describe_keyspaces().unwrap();
        assert!(keyspaces.contains("ks") && keyspaces.contains("other"));

        let families = store.describe_column_families("ks").unwrap();
        assert_eq!(
            families.get("Users"),
            Some(&ColumnFamilyDef::new(ColumnType::Standard, ColumnOrder::Lexical))
        );
    }
}
