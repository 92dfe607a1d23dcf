use crate::{
    Error,
    db::row::{Mirror, Row, SaveState},
    model::field::Autoset,
    obs::sink::{MetricsEvent, record},
    store::{Column, ConsistencyLevel},
    types::{ColumnName, RowKey},
    value::Value,
};
use std::{iter, sync::Arc};

impl Row {
    pub fn save(&mut self) -> Result<(), Error> {
        self.save_with(None)
    }

    /// Write every present column to the row key and each mirror, then run
    /// the model's save hooks in order.
    ///
    /// Writes are per key; a failure on a mirror leaves earlier keys written.
    /// A hook failure leaves the columns written and the hook's derived rows
    /// stale. Neither is rolled back.
    pub fn save_with(&mut self, consistency: Option<ConsistencyLevel>) -> Result<(), Error> {
        let model = Arc::clone(&self.model);
        let db = self.db.clone();
        record(MetricsEvent::SaveStart {
            model: model.name(),
        });

        let key = self.resolve_save_key()?;
        self.apply_autoset()?;

        let missing = self.list_missing_columns()?;
        if !missing.is_empty() {
            return Err(Error::IncompleteRow {
                model: model.name().to_string(),
                key,
                columns: missing,
            });
        }

        let columns = self.save_payload()?;
        let consistency = consistency.unwrap_or(model.write_consistency());
        let targets = self.save_targets(key);

        // columns
        self.state = SaveState::WritingColumns;
        for (committed, target) in targets.iter().enumerate() {
            let written = db.client().batch_write(
                model.keyspace(),
                target,
                model.column_family(),
                &columns,
                consistency,
            );
            if let Err(err) = written {
                self.state = SaveState::Failed;
                if committed > 0 {
                    tracing::warn!(
                        model = model.name(),
                        key = %target,
                        committed,
                        error = %err,
                        "mirror write failed; earlier keys stay written"
                    );
                }
                return Err(err.into());
            }
            tracing::debug!(
                model = model.name(),
                key = %target,
                columns = columns.len(),
                %consistency,
                "row written"
            );
        }
        self.changed.clear();

        // hooks
        self.state = SaveState::HooksRunning;
        for hook in model.save_hooks() {
            let result = hook.run(&db, self);
            record(MetricsEvent::HookRun {
                model: model.name(),
                failed: result.is_err(),
            });
            if let Err(err) = result {
                self.state = SaveState::Failed;
                tracing::warn!(
                    model = model.name(),
                    hook = hook.name(),
                    error = %err,
                    "save hook failed after columns were written"
                );
                return Err(err);
            }
        }

        self.state = SaveState::Saved;
        self.been_saved = true;
        record(MetricsEvent::SaveFinish {
            model: model.name(),
            writes: targets.len() as u64,
            columns: columns.len() as u64,
        });

        Ok(())
    }

    // Key to write under, produced from the key spec when unset.
    fn resolve_save_key(&mut self) -> Result<RowKey, Error> {
        if let Some(key) = self.row_key.as_ref().filter(|key| !key.is_empty()) {
            return Ok(key.clone());
        }

        let key = self
            .model
            .row_key_spec()
            .produce()?
            .ok_or_else(|| Error::MissingRowKey {
                model: self.model.name().to_string(),
            })?;
        self.row_key = Some(key.clone());

        Ok(key)
    }

    fn apply_autoset(&mut self) -> Result<(), Error> {
        let model = Arc::clone(&self.model);
        let now = model.timestamp();

        for (field, spec) in model.fields() {
            let column = ColumnName::from(field);
            let due = match spec.autoset_policy() {
                Some(Autoset::OnSave) => true,
                Some(Autoset::OnCreate) => !self.values.contains_key(&column),
                None => false,
            };
            if due {
                let bytes = spec
                    .to_internal(Value::Timestamp(now))
                    .map_err(|err| Error::type_mismatch(&column, err))?;
                self.put(column, bytes);
            }
        }

        Ok(())
    }

    fn save_payload(&self) -> Result<Vec<Column>, Error> {
        let verbose = self.db.config().debug;

        self.columns
            .iter()
            .map(|name| {
                let bytes = self.values.get(name).ok_or_else(|| {
                    Error::invariant(format!("column '{name}' is ordered but has no value"))
                })?;
                let spec = self.spec(name)?;
                let value = spec
                    .value_for_saving(bytes)
                    .map_err(|err| Error::type_mismatch(name, err))?;
                if verbose {
                    tracing::debug!(
                        model = self.model.name(),
                        column = %name,
                        value = %spec.to_display(bytes),
                        "saving column"
                    );
                }

                Ok(Column::new(name, value, self.model.timestamp()))
            })
            .collect()
    }

    fn save_targets(&self, key: RowKey) -> Vec<RowKey> {
        let mirrors = self.mirrors.iter().map(|mirror| match mirror {
            Mirror::Key(key) => key.clone(),
            Mirror::Deferred(f) => f(),
        });

        iter::once(key).chain(mirrors).collect()
    }
}
