//! Transformation module.
//!
//! This module turns the normalized record sets into the sales table:
//! - Fields: field-name normalization and typed cell access
//! - Join: order-preserving left joins
//! - Split: fixed-width splitting of delimited text fields
//! - Dates: order date parsing
//! - Assembler: the whole pipeline

pub mod assembler;
pub mod dates;
pub mod fields;
pub mod join;
pub mod split;

pub use assembler::{
    assemble, assemble_table, report_skipped, Assembly, DataAssembler, RowPolicy,
};
pub use fields::normalize_field_name;
