use crate::{
    Error,
    config::Config,
    db::SaveHook,
    model::{
        field::{Autoset, ColumnOrder, FieldKind, FieldSpec},
        index::IndexDeclaration,
        key::RowKeySpec,
    },
    store::{ColumnType, ConsistencyLevel},
    types::{ColumnName, timestamp::now_micros},
};
use std::collections::BTreeSet;

/// Column holding the first-save time when auto timestamps are on.
pub const CREATED_AT: &str = "created_at";

/// Column refreshed on every save when auto timestamps are on.
pub const LAST_MODIFIED: &str = "last_modified";

///
/// RowKind
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RowKind {
    #[default]
    Plain,
    /// Append-only row whose columns all share the default field spec.
    Index,
}

///
/// RowModel
///
/// Descriptor of one column family: where it lives, how its row key is
/// resolved, the declared fields in order, and what runs after a save.
///

#[derive(Clone, Debug)]
pub struct RowModel {
    name: String,
    column_family: String,
    keyspace: String,
    row_key_name: String,
    row_key: RowKeySpec,
    fields: Vec<(String, FieldSpec)>,
    default_field: Option<FieldSpec>,
    ordered: bool,
    kind: RowKind,
    column_type: ColumnType,
    read_consistency: ConsistencyLevel,
    write_consistency: ConsistencyLevel,
    timestamp_fn: fn() -> i64,
    indexes: Vec<IndexDeclaration>,
    pub(crate) save_hooks: Vec<SaveHook>,
}

impl RowModel {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RowModelBuilder {
        RowModelBuilder::new(name.into(), RowKind::Plain, Some(FieldSpec::missing()))
    }

    /// Builder for an index model; every appended entry uses `default_field`.
    #[must_use]
    pub fn index_builder(name: impl Into<String>, default_field: FieldSpec) -> RowModelBuilder {
        let mut builder = RowModelBuilder::new(name.into(), RowKind::Index, Some(default_field));
        builder.ordered = true;
        builder
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_family(&self) -> &str {
        &self.column_family
    }

    #[must_use]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[must_use]
    pub fn row_key_name(&self) -> &str {
        &self.row_key_name
    }

    #[must_use]
    pub const fn row_key_spec(&self) -> &RowKeySpec {
        &self.row_key
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    /// Spec governing a column: its declaration, else the default field.
    #[must_use]
    pub fn spec_for(&self, column: &ColumnName) -> Option<&FieldSpec> {
        column
            .as_str()
            .and_then(|name| self.field(name))
            .or(self.default_field.as_ref())
    }

    #[must_use]
    pub const fn default_field(&self) -> Option<&FieldSpec> {
        self.default_field.as_ref()
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    #[must_use]
    pub const fn kind(&self) -> RowKind {
        self.kind
    }

    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self.kind, RowKind::Index)
    }

    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Sort order the store must use for this family's column names.
    #[must_use]
    pub fn compare_with(&self) -> ColumnOrder {
        self.default_field
            .as_ref()
            .map_or(ColumnOrder::Lexical, FieldSpec::compare_with)
    }

    #[must_use]
    pub const fn read_consistency(&self) -> ConsistencyLevel {
        self.read_consistency
    }

    #[must_use]
    pub const fn write_consistency(&self) -> ConsistencyLevel {
        self.write_consistency
    }

    /// Write timestamp for a column being saved now.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        (self.timestamp_fn)()
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexDeclaration] {
        &self.indexes
    }

    #[must_use]
    pub fn save_hooks(&self) -> &[SaveHook] {
        &self.save_hooks
    }
}

///
/// RowModelBuilder
///

#[derive(Clone, Debug)]
pub struct RowModelBuilder {
    name: String,
    column_family: Option<String>,
    keyspace: Option<String>,
    row_key_name: String,
    row_key: RowKeySpec,
    fields: Vec<(String, FieldSpec)>,
    default_field: Option<FieldSpec>,
    ordered: bool,
    kind: RowKind,
    column_type: ColumnType,
    read_consistency: Option<ConsistencyLevel>,
    write_consistency: Option<ConsistencyLevel>,
    timestamp_fn: fn() -> i64,
    auto_timestamps: bool,
    indexes: Vec<IndexDeclaration>,
}

impl RowModelBuilder {
    fn new(name: String, kind: RowKind, default_field: Option<FieldSpec>) -> Self {
        Self {
            name,
            column_family: None,
            keyspace: None,
            row_key_name: "row_key".to_string(),
            row_key: RowKeySpec::default(),
            fields: Vec::new(),
            default_field,
            ordered: false,
            kind,
            column_type: ColumnType::Standard,
            read_consistency: None,
            write_consistency: None,
            timestamp_fn: now_micros,
            auto_timestamps: false,
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_family(mut self, column_family: impl Into<String>) -> Self {
        self.column_family = Some(column_family.into());
        self
    }

    #[must_use]
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    #[must_use]
    pub fn row_key(mut self, name: impl Into<String>, spec: RowKeySpec) -> Self {
        self.row_key_name = name.into();
        self.row_key = spec;
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Reject columns that have no declaration.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.default_field = None;
        self
    }

    #[must_use]
    pub fn default_field(mut self, spec: FieldSpec) -> Self {
        self.default_field = Some(spec);
        self
    }

    #[must_use]
    pub const fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    #[must_use]
    pub const fn column_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    #[must_use]
    pub const fn read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.read_consistency = Some(level);
        self
    }

    #[must_use]
    pub const fn write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.write_consistency = Some(level);
        self
    }

    /// Source of per-column write timestamps, in microseconds.
    #[must_use]
    pub const fn timestamp_fn(mut self, f: fn() -> i64) -> Self {
        self.timestamp_fn = f;
        self
    }

    /// Maintain `created_at` and `last_modified` columns.
    #[must_use]
    pub const fn auto_timestamps(mut self) -> Self {
        self.auto_timestamps = true;
        self
    }

    #[must_use]
    pub fn index(mut self, declaration: IndexDeclaration) -> Self {
        self.indexes.push(declaration);
        self
    }

    /// Resolve config fallbacks and validate the field table.
    pub(crate) fn build(self, config: &Config) -> Result<RowModel, Error> {
        let Self {
            name,
            column_family,
            keyspace,
            row_key_name,
            row_key,
            mut fields,
            default_field,
            ordered,
            kind,
            column_type,
            read_consistency,
            write_consistency,
            timestamp_fn,
            auto_timestamps,
            indexes,
        } = self;

        if name.is_empty() {
            return Err(Error::schema("model name must not be empty"));
        }
        if row_key_name.is_empty() {
            return Err(Error::schema(format!(
                "model '{name}' has an empty row key name"
            )));
        }
        if kind == RowKind::Index && default_field.is_none() {
            return Err(Error::schema(format!(
                "index model '{name}' needs a default field"
            )));
        }

        if auto_timestamps {
            for (column, policy) in [(CREATED_AT, Autoset::OnCreate), (LAST_MODIFIED, Autoset::OnSave)]
            {
                if !fields.iter().any(|(field, _)| field == column) {
                    fields.push((column.to_string(), FieldSpec::timestamp().autoset(policy)));
                }
            }
        }

        let mut seen = BTreeSet::new();
        for (field, spec) in &fields {
            if field.is_empty() {
                return Err(Error::schema(format!(
                    "model '{name}' declares a field with an empty name"
                )));
            }
            if field == &row_key_name {
                return Err(Error::schema(format!(
                    "field '{field}' of '{name}' collides with the row key name"
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(Error::schema(format!(
                    "field '{field}' declared twice on '{name}'"
                )));
            }
            if spec.autoset_policy().is_some() && !matches!(spec.kind(), FieldKind::Timestamp) {
                return Err(Error::schema(format!(
                    "field '{field}' of '{name}' is autoset but not a timestamp"
                )));
            }
        }

        Ok(RowModel {
            column_family: column_family.unwrap_or_else(|| name.clone()),
            keyspace: keyspace.unwrap_or_else(|| config.keyspace.clone()),
            name,
            row_key_name,
            row_key,
            fields,
            default_field,
            ordered,
            kind,
            column_type,
            read_consistency: read_consistency.unwrap_or(config.read_consistency),
            write_consistency: write_consistency.unwrap_or(config.write_consistency),
            timestamp_fn,
            indexes,
            save_hooks: Vec::new(),
        })
    }
}
