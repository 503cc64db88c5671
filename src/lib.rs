//! Deserializer generators.
//!
//! Build a [`ir::Generator`] tree describing a data shape, then emit a
//! self-contained Flow/JavaScript validator for it with [`emit::generate`],
//! or run it in memory with [`eval::deserialize`].
pub mod cli;
pub mod config;
pub mod deps;
pub mod emit;
pub mod error;
pub mod eval;
pub mod ir;
pub mod path_de;
pub mod render;
pub mod runtime;

pub use error::{GenError, Result};
pub use ir::{Field, Generator, Sentinel, TypeExpr};
