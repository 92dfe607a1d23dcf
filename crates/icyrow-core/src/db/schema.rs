use crate::{
    AUTO_INDEX_PREFIX, Error,
    config::Config,
    db::{SaveHook, index::IndexBinding},
    model::{
        field::{ColumnOrder, FieldSpec},
        index::IndexDeclaration,
        key::RowKeySpec,
        row::{RowModel, RowModelBuilder},
    },
};
use convert_case::{Case, Casing};
use std::{collections::BTreeMap, sync::Arc};

type BindingKey = (String, String);

///
/// Schema
///
/// Frozen registry of row models and the index bindings derived from their
/// declarations. Built once at startup and shared by every `Db` handle.
///

#[derive(Debug)]
pub struct Schema {
    config: Config,
    models: BTreeMap<String, Arc<RowModel>>,
    bindings: BTreeMap<BindingKey, Arc<IndexBinding>>,
}

impl Schema {
    #[must_use]
    pub fn builder(config: &Config) -> SchemaBuilder {
        SchemaBuilder {
            config: config.clone(),
            models: Vec::new(),
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self, name: &str) -> Result<&Arc<RowModel>, Error> {
        self.models
            .get(name)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Every registered model, index models included, by name.
    pub fn models(&self) -> impl Iterator<Item = &Arc<RowModel>> {
        self.models.values()
    }

    pub fn binding(&self, primary: &str, index: &str) -> Result<&Arc<IndexBinding>, Error> {
        self.bindings
            .get(&(primary.to_string(), index.to_string()))
            .ok_or_else(|| Error::schema(format!("model '{primary}' has no index '{index}'")))
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Arc<IndexBinding>> {
        self.bindings.values()
    }
}

///
/// SchemaBuilder
///

#[derive(Debug)]
pub struct SchemaBuilder {
    config: Config,
    models: Vec<RowModelBuilder>,
    hooks: Vec<(String, SaveHook)>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn model(mut self, model: RowModelBuilder) -> Self {
        self.models.push(model);
        self
    }

    /// Attach a save hook to a primary model; runs after its index hooks.
    #[must_use]
    pub fn hook(mut self, model: impl Into<String>, hook: SaveHook) -> Self {
        self.hooks.push((model.into(), hook));
        self
    }

    /// Build every model, bind every index declaration, and freeze.
    pub fn build(self) -> Result<Schema, Error> {
        let Self {
            config,
            models: builders,
            hooks,
        } = self;
        config.validate()?;

        let mut primaries = BTreeMap::new();
        for builder in builders {
            let model = builder.build(&config)?;
            if primaries.contains_key(model.name()) {
                return Err(Error::schema(format!(
                    "model '{}' registered twice",
                    model.name()
                )));
            }
            primaries.insert(model.name().to_string(), model);
        }

        // bind index declarations
        let mut bindings = BTreeMap::new();
        let mut index_models = BTreeMap::new();
        let mut auto_hooks = Vec::new();
        for primary in primaries.values() {
            for declaration in primary.indexes() {
                let binding = bind(&config, primary, declaration, &primaries)?;
                let key = (primary.name().to_string(), declaration.name.clone());
                if bindings.contains_key(&key) {
                    return Err(Error::schema(format!(
                        "index '{}' declared twice on '{}'",
                        declaration.name,
                        primary.name()
                    )));
                }
                if declaration.autosave {
                    auto_hooks.push((
                        primary.name().to_string(),
                        SaveHook::AutoIndex {
                            primary: primary.name().to_string(),
                            index: declaration.name.clone(),
                        },
                    ));
                }
                let model = Arc::clone(binding.model());
                index_models.insert(model.name().to_string(), model);
                bindings.insert(key, Arc::new(binding));
            }
        }

        for (model, hook) in auto_hooks.into_iter().chain(hooks) {
            let Some(primary) = primaries.get_mut(&model) else {
                return Err(if index_models.contains_key(&model) {
                    Error::schema(format!("save hooks cannot attach to index model '{model}'"))
                } else {
                    Error::UnknownModel(model)
                });
            };
            primary.save_hooks.push(hook);
        }

        let mut models: BTreeMap<String, Arc<RowModel>> = primaries
            .into_iter()
            .map(|(name, model)| (name, Arc::new(model)))
            .collect();
        for (name, model) in index_models {
            if models.insert(name.clone(), model).is_some() {
                return Err(Error::schema(format!(
                    "index model '{name}' collides with a registered model"
                )));
            }
        }

        check_references(&models)?;

        tracing::debug!(
            models = models.len(),
            indexes = bindings.len(),
            "schema built"
        );

        Ok(Schema {
            config,
            models,
            bindings,
        })
    }
}

// Materialize the index model and binding for one declaration.
fn bind(
    config: &Config,
    primary: &RowModel,
    declaration: &IndexDeclaration,
    primaries: &BTreeMap<String, RowModel>,
) -> Result<IndexBinding, Error> {
    let index = &declaration.name;
    let target_name = declaration
        .target
        .clone()
        .unwrap_or_else(|| primary.name().to_string());
    let Some(target) = primaries.get(&target_name) else {
        return Err(Error::schema(format!(
            "index '{index}' of '{}' targets unknown model '{target_name}'",
            primary.name()
        )));
    };

    let mut mandatory = declaration.mandatory;
    match (&declaration.all_key, &declaration.keyed_by) {
        (Some(_), Some(_)) => {
            return Err(Error::schema(format!(
                "index '{index}' of '{}' sets both an all key and a keyed-by field",
                primary.name()
            )));
        }
        (None, None) => {
            return Err(Error::schema(format!(
                "index '{index}' of '{}' needs an all key or a keyed-by field",
                primary.name()
            )));
        }
        (None, Some(field)) => {
            let Some(spec) = target.field(field) else {
                return Err(Error::schema(format!(
                    "index '{index}' is keyed by '{field}', which '{target_name}' does not declare"
                )));
            };
            mandatory |= spec.is_mandatory();
        }
        (Some(_), None) => {}
    }

    if declaration.autosave && target_name != primary.name() {
        return Err(Error::schema(format!(
            "autosaved index '{index}' of '{}' must target '{}', not '{target_name}'",
            primary.name(),
            primary.name()
        )));
    }

    let mut key_spec = RowKeySpec::new();
    if let Some(all_key) = &declaration.all_key {
        key_spec = key_spec.with_default(all_key);
    }

    let field = FieldSpec::foreign_key(&target_name)
        .unique()
        .ordered_by(ColumnOrder::TimeOrdered);
    let model = RowModel::index_builder(format!("{}.{index}", primary.name()), field)
        .column_family(format!(
            "{AUTO_INDEX_PREFIX}_{}_{index}",
            primary.column_family()
        ))
        .keyspace(primary.keyspace())
        .row_key(primary.column_family().to_case(Case::Snake), key_spec)
        .read_consistency(primary.read_consistency())
        .write_consistency(primary.write_consistency())
        .build(config)?;

    Ok(IndexBinding::new(
        primary.name(),
        declaration,
        target_name,
        mandatory,
        Arc::new(model),
    ))
}

// Foreign keys and linked row keys must name registered models.
fn check_references(models: &BTreeMap<String, Arc<RowModel>>) -> Result<(), Error> {
    for model in models.values() {
        let declared = model.fields();
        let fallback = model.default_field().map(|spec| ("<default>", spec));

        for (field, spec) in declared.chain(fallback) {
            if let Some(target) = spec.foreign_type()
                && !models.contains_key(target)
            {
                return Err(Error::schema(format!(
                    "field '{field}' of '{}' references unknown model '{target}'",
                    model.name()
                )));
            }
        }

        if let Some(linked) = model.row_key_spec().linked_model()
            && !models.contains_key(linked)
        {
            return Err(Error::schema(format!(
                "row key of '{}' is linked from unknown model '{linked}'",
                model.name()
            )));
        }
    }

    Ok(())
}
