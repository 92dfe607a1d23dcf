use crate::{
    Error,
    db::{Db, Row},
};
use std::{fmt, sync::Arc};

type HookFn = Arc<dyn Fn(&Db, &Row) -> Result<(), Error> + Send + Sync>;

///
/// SaveHook
///
/// Runs after a row's columns have been written, in registration order.
/// A failing hook aborts the remaining hooks but never undoes the write.
///

#[derive(Clone)]
pub enum SaveHook {
    /// Append the saved row into a bound index.
    AutoIndex { primary: String, index: String },

    Custom { name: String, f: HookFn },
}

impl SaveHook {
    #[must_use]
    pub fn custom(
        name: impl Into<String>,
        f: impl Fn(&Db, &Row) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::AutoIndex { index, .. } => index,
            Self::Custom { name, .. } => name,
        }
    }

    pub(crate) fn run(&self, db: &Db, row: &Row) -> Result<(), Error> {
        match self {
            Self::AutoIndex { primary, index } => {
                db.binding(primary, index)?.target_saved(db, row)?;
                Ok(())
            }
            Self::Custom { f, .. } => f(db, row),
        }
    }
}

impl fmt::Debug for SaveHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoIndex { primary, index } => f
                .debug_struct("AutoIndex")
                .field("primary", primary)
                .field("index", index)
                .finish(),
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}
