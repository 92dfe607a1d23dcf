//! Runtime layer: the `Db` handle, change-tracked rows, index rows and the
//! schema registry they are resolved against.

mod hook;
pub mod index;
mod locks;
pub mod row;
mod schema;
mod verify;

use crate::{
    Error,
    config::Config,
    model::row::RowModel,
    store::{SchemaIntrospector, StoreClient},
    types::RowKey,
};
use locks::IndexLocks;
use std::{
    fmt,
    sync::{Arc, MutexGuard},
};

// re-exports
pub use hook::SaveHook;
pub use index::{AppendOutcome, IndexBinding, IndexRow};
pub use row::{AccessMode, LoadMulti, LoadOptions, Row, SaveState};
pub use schema::{Schema, SchemaBuilder};

///
/// Db
///
/// Cheap-to-clone handle bundling the frozen schema, its config, and the
/// store client. Every row carries one.
///

#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

struct DbInner {
    schema: Schema,
    client: Arc<dyn StoreClient>,
    introspector: Option<Arc<dyn SchemaIntrospector>>,
    locks: IndexLocks,
}

impl Db {
    #[must_use]
    pub fn new(schema: Schema, client: Arc<dyn StoreClient>) -> Self {
        Self::builder(schema, client).build()
    }

    #[must_use]
    pub fn builder(schema: Schema, client: Arc<dyn StoreClient>) -> DbBuilder {
        DbBuilder {
            schema,
            client,
            introspector: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        self.inner.schema.config()
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub(crate) fn client(&self) -> &dyn StoreClient {
        self.inner.client.as_ref()
    }

    pub(crate) fn introspector(&self) -> Option<&dyn SchemaIntrospector> {
        self.inner.introspector.as_deref()
    }

    pub fn model(&self, name: &str) -> Result<Arc<RowModel>, Error> {
        self.schema().model(name).cloned()
    }

    pub fn binding(&self, primary: &str, index: &str) -> Result<Arc<IndexBinding>, Error> {
        self.schema().binding(primary, index).cloned()
    }

    /// Empty, unkeyed row of the named model.
    pub fn row(&self, model: &str) -> Result<Row, Error> {
        Row::new(self, model)
    }

    pub fn row_with_key(&self, model: &str, key: impl Into<RowKey>) -> Result<Row, Error> {
        Row::with_key(self, model, key)
    }

    /// Index row of a bound index under an explicit key.
    pub fn index_row(
        &self,
        primary: &str,
        index: &str,
        key: impl Into<RowKey>,
    ) -> Result<IndexRow, Error> {
        let binding = self.binding(primary, index)?;

        IndexRow::from_model(self, Arc::clone(binding.model()), Some(key.into()))
    }

    /// Index row of a bound index under its global all key.
    pub fn global_index_row(&self, primary: &str, index: &str) -> Result<IndexRow, Error> {
        let binding = self.binding(primary, index)?;

        IndexRow::from_model(self, Arc::clone(binding.model()), None)
    }

    pub fn load_multi(
        &self,
        model: &str,
        keys: &[RowKey],
        ordered: bool,
        options: &LoadOptions,
    ) -> Result<LoadMulti, Error> {
        Row::load_multi(self, model, keys, ordered, options)
    }

    /// Lock serializing appends to one index row in this process.
    pub(crate) fn index_lock(&self, column_family: &str, key: &RowKey) -> MutexGuard<'_, ()> {
        self.inner.locks.lock(column_family, key)
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("cluster", &self.config().cluster)
            .field("keyspace", &self.config().keyspace)
            .field("introspector", &self.inner.introspector.is_some())
            .finish_non_exhaustive()
    }
}

///
/// DbBuilder
///

pub struct DbBuilder {
    schema: Schema,
    client: Arc<dyn StoreClient>,
    introspector: Option<Arc<dyn SchemaIntrospector>>,
}

impl DbBuilder {
    /// Collaborator used by `Db::verify_schema`.
    #[must_use]
    pub fn introspector(mut self, introspector: Arc<dyn SchemaIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    #[must_use]
    pub fn build(self) -> Db {
        Db {
            inner: Arc::new(DbInner {
                schema: self.schema,
                client: self.client,
                introspector: self.introspector,
                locks: IndexLocks::default(),
            }),
        }
    }
}
