use icyrow::{
    core::{
        obs::{metrics_report, metrics_reset_all},
        store::{ColumnFamilyDef, MemoryStore},
    },
    prelude::*,
};
use std::sync::Arc;

const CONFIG: &str = r#"
cluster = "test"
keyspace = "accounts"
write_consistency = "quorum"
"#;

fn user_model(mandatory_email: bool) -> icyrow::core::model::row::RowModelBuilder {
    let mut by_email = IndexDeclaration::new("by_email").keyed_by("email").autosave();
    if mandatory_email {
        by_email = by_email.mandatory();
    }

    RowModel::builder("User")
        .column_family("Users")
        .row_key("user_id", RowKeySpec::new())
        .field("name", FieldSpec::text().mandatory())
        .field("email", FieldSpec::text())
        .index(by_email)
        .index(IndexDeclaration::new("everyone").all_key("all").autosave())
}

fn open(mandatory_email: bool) -> (Db, Arc<MemoryStore>) {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let schema = Schema::builder(&config)
        .model(user_model(mandatory_email))
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new());

    (
        Db::builder(schema, store.clone())
            .introspector(store.clone())
            .build(),
        store,
    )
}

fn save_user(db: &Db, key: &str, email: Option<&str>) -> Result<Row, Error> {
    let mut user = db.row_with_key("User", key)?;
    user.set("name", format!("user {key}"))?;
    if let Some(email) = email {
        user.set("email", email)?;
    }
    user.save()?;

    Ok(user)
}

fn resolved_keys(index: &IndexRow) -> Vec<String> {
    index
        .resolve()
        .unwrap()
        .map(|row| row.unwrap().row_key().unwrap().to_string())
        .collect()
}

#[test]
fn saving_a_row_maintains_its_indexes() {
    metrics_reset_all();
    let (db, store) = open(false);

    let user = save_user(&db, "a", Some("a@x")).unwrap();
    assert_eq!(user.save_state(), SaveState::Saved);

    let mut by_email = db.index_row("User", "by_email", "a@x").unwrap();
    by_email.load().unwrap();
    assert_eq!(resolved_keys(&by_email), ["a"]);

    let resolved = by_email.resolve().unwrap().next().unwrap().unwrap();
    assert_eq!(resolved.get("name").unwrap(), Some(Value::Text("user a".into())));
    assert_eq!(resolved.get("email").unwrap(), Some(Value::Text("a@x".into())));

    // saving again must not add a second entry
    save_user(&db, "a", Some("a@x")).unwrap();
    let stored = store
        .row("accounts", "Auto_Users_by_email", &RowKey::from("a@x"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.len(), 1);

    let ops = metrics_report().counters.unwrap().ops;
    assert_eq!(ops.index_appends, 2);
    assert_eq!(ops.duplicates_suppressed, 2);
    assert_eq!(ops.hooks_failed, 0);
}

#[test]
fn writes_use_the_configured_consistency_and_keyspace() {
    let (db, store) = open(false);
    save_user(&db, "a", Some("a@x")).unwrap();

    let writes = store.write_log().unwrap();
    let families: Vec<&str> = writes.iter().map(|w| w.column_family.as_str()).collect();

    assert_eq!(families, ["Users", "Auto_Users_by_email", "Auto_Users_everyone"]);
    assert!(writes.iter().all(|w| w.keyspace == "accounts"));
    assert!(writes.iter().all(|w| w.consistency == ConsistencyLevel::Quorum));
}

#[test]
fn global_index_collects_every_saved_row() {
    let (db, _) = open(false);
    for key in ["c", "a", "b"] {
        save_user(&db, key, None).unwrap();
    }

    let mut everyone = db.global_index_row("User", "everyone").unwrap();
    everyone.load().unwrap();

    assert_eq!(resolved_keys(&everyone), ["c", "a", "b"]);
}

#[test]
fn unset_optional_index_field_skips_the_index() {
    let (db, store) = open(false);

    save_user(&db, "b", None).unwrap();

    let families: Vec<String> = store
        .write_log()
        .unwrap()
        .into_iter()
        .map(|w| w.column_family)
        .collect();
    assert_eq!(families, ["Users", "Auto_Users_everyone"]);
}

#[test]
fn unset_mandatory_index_field_fails_after_the_write() {
    let (db, store) = open(true);

    let err = save_user(&db, "b", None).unwrap_err();

    assert!(matches!(err, Error::MandatoryIndexFieldMissing { .. }));
    assert_eq!(err.class(), ErrorClass::InvariantViolation);
    assert_eq!(err.origin(), ErrorOrigin::Index);

    // the row itself was written before the hook ran
    assert!(
        store
            .row("accounts", "Users", &RowKey::from("b"))
            .unwrap()
            .is_some()
    );
}

#[test]
fn index_rows_are_shared_between_users_with_one_email() {
    let (db, _) = open(false);
    save_user(&db, "a", Some("team@x")).unwrap();
    save_user(&db, "b", Some("team@x")).unwrap();

    let mut team = db.index_row("User", "by_email", "team@x").unwrap();
    team.load().unwrap();

    assert_eq!(resolved_keys(&team), ["a", "b"]);
}

#[test]
fn schema_verifies_against_the_store() {
    let (db, store) = open(false);
    for (family, order) in [
        ("Users", ColumnOrder::Lexical),
        ("Auto_Users_by_email", ColumnOrder::TimeOrdered),
        ("Auto_Users_everyone", ColumnOrder::TimeOrdered),
    ] {
        store
            .define_column_family("accounts", family, ColumnFamilyDef::standard(order))
            .unwrap();
    }

    db.verify_schema(false).unwrap();
    assert_eq!(db.config().cluster, "test");
    assert!(!icyrow::VERSION.is_empty());
}
