use super::*;
use crate::{
    config::Config,
    db::{LoadOptions, SaveHook, Schema},
    model::{
        field::FieldSpec,
        key::RowKeySpec,
        row::{CREATED_AT, LAST_MODIFIED, RowModel},
    },
    store::{
        Column, ConsistencyLevel, KeySlice, MemoryStore, SlicePredicate, StoreClient, StoreError,
    },
};
use std::sync::Arc;

const KEYSPACE: &str = "app";

fn fixed_clock() -> i64 {
    1_700_000_000_000_000
}

fn user_model() -> crate::model::row::RowModelBuilder {
    RowModel::builder("User")
        .column_family("Users")
        .row_key("user_id", RowKeySpec::new())
        .field("name", FieldSpec::text().mandatory())
        .field("age", FieldSpec::int())
        .field("active", FieldSpec::bool().with_default(true).mandatory())
        .timestamp_fn(fixed_clock)
}

fn schema() -> Schema {
    Schema::builder(&Config::default().with_keyspace(KEYSPACE))
        .model(user_model())
        .model(
            RowModel::builder("Event")
                .row_key("id", RowKeySpec::new().autogenerate())
                .field("kind", FieldSpec::text())
                .auto_timestamps(),
        )
        .model(
            RowModel::builder("Tag")
                .field("label", FieldSpec::text())
                .strict(),
        )
        .model(
            RowModel::builder("Profile")
                .row_key("user_id", RowKeySpec::new().linked_from("User"))
                .field("bio", FieldSpec::text()),
        )
        .model(
            RowModel::builder("Favorites")
                .row_key("owner", RowKeySpec::new())
                .default_field(FieldSpec::foreign_key("User")),
        )
        .build()
        .unwrap()
}

fn db_with(client: Arc<dyn StoreClient>) -> Db {
    Db::new(schema(), client)
}

fn memory_db() -> (Db, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    (db_with(store.clone()), store)
}

fn saved_user(db: &Db, key: &str, name: &str) -> Row {
    let mut row = db.row_with_key("User", key).unwrap();
    row.set("name", name).unwrap();
    row.save().unwrap();

    row
}

///
/// StrayKeyStore
/// Answers every read with a row nobody asked for.
///

struct StrayKeyStore;

impl StoreClient for StrayKeyStore {
    fn batch_write(
        &self,
        _: &str,
        _: &RowKey,
        _: &str,
        _: &[Column],
        _: ConsistencyLevel,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn batch_read(
        &self,
        _: &str,
        _: &[RowKey],
        _: &str,
        _: &SlicePredicate,
        _: ConsistencyLevel,
    ) -> Result<Vec<KeySlice>, StoreError> {
        Ok(vec![KeySlice {
            key: RowKey::from("intruder"),
            columns: vec![Column::new("name", "mallory", 1)],
        }])
    }
}

///
/// FailingKeyStore
/// Rejects writes to one key, delegating everything else.
///

struct FailingKeyStore {
    inner: MemoryStore,
    failing: RowKey,
}

impl StoreClient for FailingKeyStore {
    fn batch_write(
        &self,
        keyspace: &str,
        key: &RowKey,
        column_family: &str,
        columns: &[Column],
        consistency: ConsistencyLevel,
    ) -> Result<(), StoreError> {
        if *key == self.failing {
            return Err(StoreError::Timeout);
        }

        self.inner
            .batch_write(keyspace, key, column_family, columns, consistency)
    }

    fn batch_read(
        &self,
        keyspace: &str,
        keys: &[RowKey],
        column_family: &str,
        predicate: &SlicePredicate,
        consistency: ConsistencyLevel,
    ) -> Result<Vec<KeySlice>, StoreError> {
        self.inner
            .batch_read(keyspace, keys, column_family, predicate, consistency)
    }
}

// ----------------------------------------------------------------------
// column access
// ----------------------------------------------------------------------

#[test]
fn set_and_get_convert_through_field_specs() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();

    row.set("name", "ada").unwrap();
    row.set("age", 36_i64).unwrap();

    assert_eq!(row.get("name").unwrap(), Some(Value::Text("ada".into())));
    assert_eq!(row.get("age").unwrap(), Some(Value::Int(36)));
    assert_eq!(row.get_raw(&ColumnName::from("age")), Some(&b"36"[..]));
    assert_eq!(row.get("nickname").unwrap(), None);

    let keys: Vec<String> = row.keys().map(ToString::to_string).collect();
    assert_eq!(keys, ["name", "age"]);
}

#[test]
fn update_routes_the_row_key_by_name() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();

    row.update(
        [("user_id", Value::from("u1")), ("name", Value::from("ada"))],
        AccessMode::Internal,
    )
    .unwrap();

    assert_eq!(row.row_key(), Some(&RowKey::from("u1")));
    assert_eq!(row.get("user_id").unwrap(), Some(Value::Key("u1".into())));
    assert_eq!(row.len(), 1);
}

#[test]
fn update_is_all_or_nothing() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();

    let err = row
        .update(
            [("name", Value::from("ada")), ("age", Value::from("old"))],
            AccessMode::Internal,
        )
        .unwrap_err();

    assert!(matches!(err, Error::TypeMismatch { ref column, .. } if column == "age"));
    assert!(row.is_empty());
}

#[test]
fn identity_access_takes_only_raw_bytes() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();

    row.update([("age", Value::Bytes(b"7".to_vec()))], AccessMode::Identity)
        .unwrap();
    assert_eq!(row.get("age").unwrap(), Some(Value::Int(7)));

    let err = row
        .update([("age", Value::Int(8))], AccessMode::Identity)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn linked_rows_take_the_related_key() {
    let (db, _) = memory_db();
    let user = db.row_with_key("User", "u1").unwrap();
    let mut profile = db.row("Profile").unwrap();

    profile.link_to(&user).unwrap();
    assert_eq!(profile.row_key(), Some(&RowKey::from("u1")));

    let tag = db.row_with_key("Tag", "t1").unwrap();
    assert!(matches!(
        profile.link_to(&tag),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        profile.link_to(&db.row("User").unwrap()),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn undeclared_columns_fall_back_to_the_default_field() {
    let (db, _) = memory_db();

    let mut loose = db.row("User").unwrap();
    loose.set("extra", b"raw".to_vec()).unwrap();
    assert_eq!(loose.get("extra").unwrap(), Some(Value::Bytes(b"raw".to_vec())));

    let mut strict = db.row("Tag").unwrap();
    assert!(matches!(
        strict.set("extra", b"raw".to_vec()),
        Err(Error::Schema(_))
    ));
}

#[test]
fn mandatory_columns_cannot_be_deleted() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();
    row.set("name", "ada").unwrap();
    row.set("age", 36_i64).unwrap();

    assert!(matches!(
        row.delete("name"),
        Err(Error::MandatoryColumnDelete { .. })
    ));
    assert!(row.delete("age").unwrap());
    assert!(!row.delete("age").unwrap());
    assert_eq!(row.len(), 1);
}

#[test]
fn missing_columns_materialize_defaults() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();

    assert_eq!(row.list_missing_columns().unwrap(), ["name"]);
    assert_eq!(row.get("active").unwrap(), Some(Value::Bool(true)));

    row.set("name", "").unwrap();
    assert!(!row.is_complete().unwrap());

    row.set("name", "ada").unwrap();
    assert!(row.is_complete().unwrap());
}

// ----------------------------------------------------------------------
// save
// ----------------------------------------------------------------------

#[test]
fn incomplete_rows_are_never_written() {
    let (db, store) = memory_db();
    let mut row = db.row_with_key("User", "u1").unwrap();
    row.set("age", 36_i64).unwrap();

    let err = row.save().unwrap_err();

    assert!(
        matches!(err, Error::IncompleteRow { ref columns, .. } if columns == &["name".to_string()])
    );
    assert_eq!(row.save_state(), SaveState::Unsaved);
    assert!(store.write_log().unwrap().is_empty());
}

#[test]
fn save_writes_the_key_and_every_mirror() {
    let (db, store) = memory_db();
    let mut row = db.row_with_key("User", "u1").unwrap();
    row.set("name", "ada").unwrap();
    row.add_mirror("u1-copy");
    row.add_mirror("u1-copy");
    row.add_mirror_with(|| RowKey::from("late"));

    row.save().unwrap();

    let writes = store.write_log().unwrap();
    let keys: Vec<&str> = writes.iter().map(|w| w.key.as_str()).collect();
    assert_eq!(keys, ["u1", "u1-copy", "late"]);

    let first = &writes[0];
    assert_eq!(first.keyspace, KEYSPACE);
    assert_eq!(first.column_family, "Users");
    assert!(first.columns.iter().all(|c| c.timestamp == fixed_clock()));
    assert_eq!(first.columns.len(), 2);
    assert!(writes.iter().all(|w| w.columns == first.columns));

    assert_eq!(row.save_state(), SaveState::Saved);
    assert!(row.been_saved());
    assert_eq!(row.changed_columns().count(), 0);
}

#[test]
fn explicit_consistency_overrides_the_model() {
    let (db, store) = memory_db();
    let mut row = db.row_with_key("User", "u1").unwrap();
    row.set("name", "ada").unwrap();

    row.save_with(Some(ConsistencyLevel::Quorum)).unwrap();

    assert_eq!(
        store.write_log().unwrap()[0].consistency,
        ConsistencyLevel::Quorum
    );
}

#[test]
fn failed_mirror_write_marks_the_row_failed() {
    let store = Arc::new(FailingKeyStore {
        inner: MemoryStore::new(),
        failing: RowKey::from("mirror"),
    });
    let db = db_with(store.clone());
    let mut row = db.row_with_key("User", "u1").unwrap();
    row.set("name", "ada").unwrap();
    row.add_mirror("mirror");

    let err = row.save().unwrap_err();

    assert!(matches!(err, Error::Store(StoreError::Timeout)));
    assert_eq!(row.save_state(), SaveState::Failed);
    assert!(
        store
            .inner
            .row(KEYSPACE, "Users", &RowKey::from("u1"))
            .unwrap()
            .is_some()
    );
}

#[test]
fn unkeyed_rows_need_a_key_source() {
    let (db, store) = memory_db();
    let mut row = db.row("User").unwrap();
    row.set("name", "ada").unwrap();

    assert!(matches!(row.save(), Err(Error::MissingRowKey { .. })));

    let mut event = db.row("Event").unwrap();
    event.set("kind", "login").unwrap();
    event.save().unwrap();

    let key = event.row_key().cloned().unwrap();
    assert_eq!(key.len(), 26);
    assert_eq!(store.write_log().unwrap()[0].key, key);
}

#[test]
fn auto_timestamps_track_creation_and_modification() {
    let (db, _) = memory_db();
    let mut event = db.row("Event").unwrap();
    event.set("kind", "login").unwrap();
    event.save().unwrap();

    let created = event.get(CREATED_AT).unwrap();
    let modified = event.get(LAST_MODIFIED).unwrap();
    assert!(matches!(created, Some(Value::Timestamp(_))));
    assert!(matches!(modified, Some(Value::Timestamp(_))));

    std::thread::sleep(std::time::Duration::from_millis(2));
    event.save().unwrap();

    assert_eq!(event.get(CREATED_AT).unwrap(), created);
    assert_ne!(event.get(LAST_MODIFIED).unwrap(), modified);
}

#[test]
fn hook_failure_keeps_the_write_and_reports_failed() {
    let store = Arc::new(MemoryStore::new());
    let schema = Schema::builder(&Config::default().with_keyspace(KEYSPACE))
        .model(user_model())
        .hook(
            "User",
            SaveHook::custom("audit", |_, _| Err(Error::invariant("audit log offline"))),
        )
        .build()
        .unwrap();
    let db = Db::new(schema, store.clone());

    let mut row = db.row_with_key("User", "u1").unwrap();
    row.set("name", "ada").unwrap();
    let err = row.save().unwrap_err();

    assert!(matches!(err, Error::Invariant(_)));
    assert_eq!(row.save_state(), SaveState::Failed);
    assert!(!row.been_saved());
    assert_eq!(store.write_log().unwrap().len(), 1);
}

#[test]
fn hooks_see_the_saved_row() {
    let store = Arc::new(MemoryStore::new());
    let schema = Schema::builder(&Config::default().with_keyspace(KEYSPACE))
        .model(user_model())
        .hook(
            "User",
            SaveHook::custom("check", |_, row| {
                if row.save_state() == SaveState::HooksRunning && row.row_key().is_some() {
                    Ok(())
                } else {
                    Err(Error::invariant("hook ran too early"))
                }
            }),
        )
        .build()
        .unwrap();
    let db = Db::new(schema, store);

    saved_user(&db, "u1", "ada");
}

// ----------------------------------------------------------------------
// load
// ----------------------------------------------------------------------

#[test]
fn load_reads_back_saved_columns() {
    let (db, _) = memory_db();
    saved_user(&db, "u1", "ada");

    let mut row = db.row_with_key("User", "u1").unwrap();
    row.load().unwrap();

    assert!(row.been_loaded());
    assert_eq!(row.get("name").unwrap(), Some(Value::Text("ada".into())));
    assert_eq!(row.get("active").unwrap(), Some(Value::Bool(true)));
}

#[test]
fn load_of_an_unknown_key_is_not_found() {
    let (db, _) = memory_db();
    let mut row = db.row_with_key("User", "ghost").unwrap();

    assert!(matches!(row.load(), Err(Error::RowNotFound { .. })));
    assert!(!row.been_loaded());
}

#[test]
fn load_rejects_a_row_it_did_not_ask_for() {
    let db = db_with(Arc::new(StrayKeyStore));
    let mut row = db.row_with_key("User", "u1").unwrap();

    let err = row.load().unwrap_err();

    assert!(matches!(
        err,
        Error::UnexpectedKey { ref requested, ref returned, .. }
            if requested.as_str() == "u1" && returned.as_str() == "intruder"
    ));
}

#[test]
fn load_honours_column_selection() {
    let (db, _) = memory_db();
    let mut source = db.row_with_key("User", "u1").unwrap();
    source.set("name", "ada").unwrap();
    source.set("age", 36_i64).unwrap();
    source.save().unwrap();

    let mut row = db.row_with_key("User", "u1").unwrap();
    row.load_with(&LoadOptions::new().columns(["age"])).unwrap();

    assert_eq!(row.len(), 1);
    assert_eq!(row.get("age").unwrap(), Some(Value::Int(36)));
}

#[test]
fn load_multi_ordered_follows_the_requested_keys() {
    let (db, _) = memory_db();
    for (key, name) in [("a", "ann"), ("b", "bob"), ("c", "cy")] {
        saved_user(&db, key, name);
    }

    let keys = [RowKey::from("c"), RowKey::from("a"), RowKey::from("c")];
    let rows: Vec<Row> = db
        .load_multi("User", &keys, true, &LoadOptions::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let loaded: Vec<&str> = rows.iter().filter_map(|r| r.row_key()).map(RowKey::as_str).collect();
    assert_eq!(loaded, ["c", "a", "c"]);
    assert!(rows.iter().all(Row::been_loaded));
}

#[test]
fn load_multi_unordered_keeps_response_order() {
    let (db, _) = memory_db();
    saved_user(&db, "b", "bob");
    saved_user(&db, "a", "ann");

    let keys = [RowKey::from("b"), RowKey::from("zzz"), RowKey::from("a")];
    let rows = db
        .load_multi("User", &keys, false, &LoadOptions::default())
        .unwrap();
    assert_eq!(rows.len(), 2);

    let loaded: Vec<String> = rows
        .map(|row| row.unwrap().row_key().unwrap().to_string())
        .collect();
    assert_eq!(loaded, ["a", "b"]);
}

#[test]
fn load_multi_ordered_fails_on_a_missing_key() {
    let (db, _) = memory_db();
    saved_user(&db, "a", "ann");

    let keys = [RowKey::from("a"), RowKey::from("gone")];
    let err = db
        .load_multi("User", &keys, true, &LoadOptions::default())
        .unwrap_err();

    assert!(matches!(err, Error::RowNotFound { ref key, .. } if key.as_str() == "gone"));
}

#[test]
fn load_multi_of_no_keys_does_not_touch_the_store() {
    let (db, store) = memory_db();

    let mut rows = db
        .load_multi("User", &[], true, &LoadOptions::default())
        .unwrap();

    assert!(rows.next().is_none());
    assert_eq!(store.read_count().unwrap(), 0);
}

#[test]
fn load_subkeys_resolves_references_in_column_order() {
    let (db, _) = memory_db();
    saved_user(&db, "a", "ann");
    saved_user(&db, "b", "bob");

    let mut favorites = db.row_with_key("Favorites", "owner-1").unwrap();
    favorites.set("2-second", Value::Key("a".into())).unwrap();
    favorites.set("1-first", Value::Key("b".into())).unwrap();
    favorites.save().unwrap();

    let mut loaded = db.row_with_key("Favorites", "owner-1").unwrap();
    let rows = loaded.load_subkeys(&LoadOptions::default()).unwrap();

    let names: Vec<Value> = rows
        .iter()
        .map(|row| row.get("name").unwrap().unwrap())
        .collect();
    assert_eq!(names, [Value::Text("bob".into()), Value::Text("ann".into())]);
}

// ----------------------------------------------------------------------
// identity and display
// ----------------------------------------------------------------------

#[test]
fn rows_compare_by_model_and_key() {
    let (db, _) = memory_db();
    let mut a = db.row_with_key("User", "u1").unwrap();
    let b = db.row_with_key("User", "u1").unwrap();
    a.set("name", "ada").unwrap();

    assert_eq!(a, b);
    assert_ne!(a, db.row_with_key("User", "u2").unwrap());
    assert_ne!(a, db.row_with_key("Tag", "u1").unwrap());
}

#[test]
fn display_and_path_render_position_and_columns() {
    let (db, _) = memory_db();
    let mut row = db.row("User").unwrap();
    row.set("name", "ada").unwrap();
    row.set("age", 36_i64).unwrap();

    assert_eq!(row.to_string(), r#"<User ?: {age: 36, name: "ada"}>"#);
    assert_eq!(row.path(), "default/app/Users");

    row.set_row_key("u1");
    assert!(row.to_string().starts_with("<User u1: {"));
    assert_eq!(row.path(), "default/app/Users/u1");
}

#[test]
fn ordered_models_display_columns_in_insertion_order() {
    let schema = Schema::builder(&Config::default().with_keyspace(KEYSPACE))
        .model(
            RowModel::builder("Log")
                .field("zeta", FieldSpec::text())
                .field("alpha", FieldSpec::text())
                .ordered(),
        )
        .build()
        .unwrap();
    let db = Db::new(schema, Arc::new(MemoryStore::new()));

    let mut row = db.row_with_key("Log", "l1").unwrap();
    row.set("zeta", "z").unwrap();
    row.set("alpha", "a").unwrap();

    assert_eq!(row.to_string(), r#"<Log l1: {zeta: "z", alpha: "a"}>"#);
}
