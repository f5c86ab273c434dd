//! chaptrack: syllabus chapter tracking with a cache-aside read path.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
