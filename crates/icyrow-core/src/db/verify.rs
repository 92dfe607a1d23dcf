use crate::{
    Error,
    db::Db,
    store::{ColumnFamilyDef, SchemaIntrospector},
};
use std::collections::{BTreeMap, BTreeSet};

impl Db {
    /// Compare every registered model against what the live store reports.
    ///
    /// A missing keyspace is a mismatch unless `fix` is set, in which case it
    /// is created and checking continues. Column families are never created.
    pub fn verify_schema(&self, fix: bool) -> Result<(), Error> {
        let Some(introspector) = self.introspector() else {
            return Err(Error::schema("no schema introspector configured"));
        };

        let mut keyspaces = introspector.describe_keyspaces()?;
        let mut families: BTreeMap<String, BTreeMap<String, ColumnFamilyDef>> = BTreeMap::new();

        for model in self.schema().models() {
            let keyspace = model.keyspace();
            ensure_keyspace(introspector, &mut keyspaces, keyspace, fix)?;

            if !families.contains_key(keyspace) {
                let described = introspector.describe_column_families(keyspace)?;
                families.insert(keyspace.to_string(), described);
            }
            let def = families
                .get(keyspace)
                .and_then(|defs| defs.get(model.column_family()))
                .ok_or_else(|| Error::UnknownColumnFamily {
                    keyspace: keyspace.to_string(),
                    column_family: model.column_family().to_string(),
                })?;

            if def.column_type != model.column_type() {
                return Err(Error::SchemaMismatch(format!(
                    "column family '{}' of '{}' is {} in the store but declared {}",
                    model.column_family(),
                    model.name(),
                    def.column_type,
                    model.column_type()
                )));
            }
            if def.compare_with != model.compare_with() {
                return Err(Error::SchemaMismatch(format!(
                    "column family '{}' of '{}' compares with {} in the store but is declared {}",
                    model.column_family(),
                    model.name(),
                    def.compare_with.comparator(),
                    model.compare_with().comparator()
                )));
            }

            tracing::debug!(
                model = model.name(),
                keyspace,
                column_family = model.column_family(),
                "column family verified"
            );
        }

        Ok(())
    }
}

fn ensure_keyspace(
    introspector: &dyn SchemaIntrospector,
    keyspaces: &mut BTreeSet<String>,
    keyspace: &str,
    fix: bool,
) -> Result<(), Error> {
    if keyspaces.contains(keyspace) {
        return Ok(());
    }
    if !fix {
        return Err(Error::SchemaMismatch(format!(
            "keyspace '{keyspace}' does not exist"
        )));
    }

    introspector.add_keyspace(keyspace)?;
    keyspaces.insert(keyspace.to_string());
    tracing::info!(keyspace, "keyspace created during schema verification");

    Ok(())
}
