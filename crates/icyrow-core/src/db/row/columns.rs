use crate::types::ColumnName;
use std::collections::HashSet;

///
/// OrderedColumns
/// Insertion-ordered set of column names.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct OrderedColumns {
    order: Vec<ColumnName>,
    members: HashSet<ColumnName>,
}

impl OrderedColumns {
    /// Append unless already present; returns whether it was new.
    pub(crate) fn insert(&mut self, name: &ColumnName) -> bool {
        if self.members.contains(name) {
            return false;
        }
        self.members.insert(name.clone());
        self.order.push(name.clone());

        true
    }

    pub(crate) fn remove(&mut self, name: &ColumnName) -> bool {
        if !self.members.remove(name) {
            return false;
        }
        self.order.retain(|column| column != name);

        true
    }

    pub(crate) fn contains(&self, name: &ColumnName) -> bool {
        self.members.contains(name)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, ColumnName> {
        self.order.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
