use crate::{
    Error,
    db::{
        Db,
        index::{AppendOutcome, IndexRow},
        row::Row,
    },
    model::{index::IndexDeclaration, row::RowModel},
    types::{ColumnName, RowKey},
};
use std::sync::Arc;

///
/// IndexBinding
///
/// One index declaration resolved against the schema: the primary model it
/// was declared on, the target model whose keys it stores, how the index row
/// key is chosen, and the index model rows are built from.
///

#[derive(Debug)]
pub struct IndexBinding {
    primary: String,
    name: String,
    target: String,
    keyed_by: Option<String>,
    all_key: Option<RowKey>,
    mandatory: bool,
    model: Arc<RowModel>,
}

impl IndexBinding {
    pub(crate) fn new(
        primary: &str,
        declaration: &IndexDeclaration,
        target: String,
        mandatory: bool,
        model: Arc<RowModel>,
    ) -> Self {
        Self {
            primary: primary.to_string(),
            name: declaration.name.clone(),
            target,
            keyed_by: declaration.keyed_by.clone(),
            all_key: declaration.all_key.clone(),
            mandatory,
            model,
        }
    }

    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<RowModel> {
        &self.model
    }

    /// Record a just-saved target row in the index row it belongs to.
    ///
    /// With an all key every row lands in the one global index row. Otherwise
    /// the keyed-by field's value picks the index row; an unset value skips
    /// the row (`Ok(None)`) unless the field is mandatory for this index.
    pub fn target_saved(&self, db: &Db, instance: &Row) -> Result<Option<AppendOutcome>, Error> {
        if instance.model().name() != self.target {
            return Err(Error::type_mismatch(
                &self.name,
                format!(
                    "index targets '{}' rows, got a '{}'",
                    self.target,
                    instance.model().name()
                ),
            ));
        }

        let Some(key) = self.index_key(instance)? else {
            tracing::debug!(
                index = %self.name,
                model = %self.target,
                "index field unset; row not indexed"
            );
            return Ok(None);
        };

        let _guard = db
            .config()
            .serialize_index_appends
            .then(|| db.index_lock(self.model.column_family(), &key));

        let mut index = IndexRow::from_model(db, Arc::clone(&self.model), Some(key))?;
        let outcome = index.append_row(instance)?;
        if let AppendOutcome::Appended(column) = &outcome {
            index.save_entry(column)?;
        }
        tracing::debug!(
            index = %self.name,
            key = ?index.row_key(),
            appended = outcome.is_appended(),
            "index updated after save"
        );

        Ok(Some(outcome))
    }

    fn index_key(&self, instance: &Row) -> Result<Option<RowKey>, Error> {
        if let Some(all_key) = &self.all_key {
            return Ok(Some(all_key.clone()));
        }
        let Some(field) = &self.keyed_by else {
            return Err(Error::invariant(format!(
                "index '{}' of '{}' has neither an all key nor a keyed-by field",
                self.name, self.primary
            )));
        };

        let column = ColumnName::from(field);
        let value = match instance.get_raw(&column) {
            Some(bytes) if !bytes.is_empty() => instance.get(column)?,
            _ => None,
        };

        // a present value that cannot name a row is an error, not an unset field
        let key = value
            .map(|value| {
                value.to_row_key().ok_or_else(|| {
                    Error::type_mismatch(
                        field,
                        format!("{value} cannot key index '{}'", self.name),
                    )
                })
            })
            .transpose()?;

        match key {
            Some(key) if !key.is_empty() => Ok(Some(key)),
            _ if self.mandatory => Err(Error::MandatoryIndexFieldMissing {
                index: self.name.clone(),
                model: self.target.clone(),
                field: field.clone(),
            }),
            _ => Ok(None),
        }
    }
}
