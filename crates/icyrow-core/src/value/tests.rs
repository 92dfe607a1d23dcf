use super::*;

#[test]
fn display_renders_each_variant() {
    assert_eq!(Value::from("a@x").to_string(), "\"a@x\"");
    assert_eq!(Value::Int(-4).to_string(), "-4");
    assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "0xdead");
    assert_eq!(Value::Key(RowKey::from("u1")).to_string(), "->u1");
    assert_eq!(Value::Timestamp(0).to_string(), "1970-01-01T00:00:00Z");
}

#[test]
fn to_row_key_covers_scalar_variants() {
    assert_eq!(Value::from("a@x").to_row_key(), Some(RowKey::from("a@x")));
    assert_eq!(Value::Int(7).to_row_key(), Some(RowKey::from("7")));
    assert_eq!(Value::Bool(true).to_row_key(), Some(RowKey::from("true")));
    assert_eq!(
        Value::Key(RowKey::from("k")).to_row_key(),
        Some(RowKey::from("k"))
    );
    assert_eq!(Value::Bytes(vec![0xff, 0xfe]).to_row_key(), None);
}

#[test]
fn kind_names_are_distinct() {
    let values = [
        Value::Bool(false),
        Value::Bytes(Vec::new()),
        Value::Int(0),
        Value::Key(RowKey::default()),
        Value::Text(String::new()),
        Value::Timestamp(0),
        Value::Ulid(Ulid::nil()),
    ];
    let mut names: Vec<_> = values.iter().map(Value::kind_name).collect();
    names.sort_unstable();
    names.dedup();

    assert_eq!(names.len(), values.len());
}
