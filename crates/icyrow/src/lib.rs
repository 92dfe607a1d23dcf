//! ## Crate layout
//! - `core`: row models, change-tracked rows, index rows, the store boundary,
//!   configuration and observability.
//!
//! The `prelude` module carries the vocabulary application code needs to
//! declare a schema, open a `Db`, and work with rows and index rows.

pub use icyrow_core as core;

/// re-exports
///
/// stops the user having to add these to their own Cargo.toml
pub mod __reexports {
    pub use tracing;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::{Error, config::Config, db::Db};

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        config::Config,
        db::{Schema, SchemaBuilder},
        error::{ErrorClass, ErrorOrigin},
        model::key::HasRowKey as _,
        prelude::*,
    };
    pub use crate::Error;
}
