//! Declarative model layer: field specs, row-key specs, row models and index
//! declarations. Everything here is built once and frozen before first use.

pub mod field;
pub mod index;
pub mod key;
pub mod row;
