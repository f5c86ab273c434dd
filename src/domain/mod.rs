//! Domain layer types and invariants.

pub mod chapters;
pub mod entities;
pub mod error;
pub mod types;
