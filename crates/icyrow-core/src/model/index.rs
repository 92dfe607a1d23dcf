use crate::types::RowKey;

///
/// IndexDeclaration
///
/// A secondary index declared on a primary model. Each declaration is bound
/// at schema build time to its own index model, keyed either by one global
/// `all_key` or by the value of `keyed_by` on the saved row.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexDeclaration {
    pub(crate) name: String,
    pub(crate) target: Option<String>,
    pub(crate) keyed_by: Option<String>,
    pub(crate) all_key: Option<RowKey>,
    pub(crate) mandatory: bool,
    pub(crate) autosave: bool,
}

impl IndexDeclaration {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            keyed_by: None,
            all_key: None,
            mandatory: false,
            autosave: false,
        }
    }

    /// Model whose row keys the index stores. Defaults to the declaring model.
    #[must_use]
    pub fn target(mut self, model: impl Into<String>) -> Self {
        self.target = Some(model.into());
        self
    }

    /// One index row per distinct value of this field on the target.
    #[must_use]
    pub fn keyed_by(mut self, field: impl Into<String>) -> Self {
        self.keyed_by = Some(field.into());
        self
    }

    /// A single global index row under this key.
    #[must_use]
    pub fn all_key(mut self, key: impl Into<RowKey>) -> Self {
        self.all_key = Some(key.into());
        self
    }

    /// Saving a row without the keyed-by value fails instead of skipping.
    #[must_use]
    pub const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Append every saved row of the declaring model automatically.
    #[must_use]
    pub const fn autosave(mut self) -> Self {
        self.autosave = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
