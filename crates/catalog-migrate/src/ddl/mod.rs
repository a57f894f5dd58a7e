//! Target definitions: catalog DDL rewriting and table DDL generation.

pub mod assisted;
pub mod generator;
pub mod rewrite;

pub use assisted::AssistedGenerator;
pub use generator::{DdlGenerator, DeterministicGenerator, GeneratedDdl, TableDdlGenerator};
pub use rewrite::rewrite_definition;
