//! EVE reference data subset builder
//!
//! Reduces the full reference dataset to the blueprints, types and name
//! index an offline client needs for manufacturing lookups.

pub mod error;
pub mod extract;
pub mod filter;
pub mod materials;
pub mod models;
pub mod names;
pub mod output;
pub mod product;
pub mod shape;
pub mod source;

pub use error::{Result, SubsetError};
pub use extract::{ExtractStats, Subset, build_subset};
pub use filter::{FilterPolicy, Mode};
pub use output::write_artifacts;
pub use source::{ReferenceData, ReferenceSource};
