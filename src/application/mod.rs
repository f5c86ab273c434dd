//! Application services layer.

pub mod analytics;
pub mod chapters;
pub mod error;
pub mod pagination;
pub mod repos;
