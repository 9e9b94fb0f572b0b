//! Shared domain types and error taxonomy for the freightline pipeline.
//!
//! This crate has no I/O and no async dependencies: it is the sum-type core
//! that every other crate in the workspace builds on. Analysis shapes are
//! closed enumerations over a fixed record (see `enums` and `model`), not
//! open dictionaries — normalization, validation, and scoring all operate on
//! these concrete types.

pub mod enums;
pub mod error;
pub mod ids;
pub mod model;

pub use enums::*;
pub use error::FreightlineError;
pub use model::*;
