//! Nutritrack Library
//!
//! Ingredients, recipes, meals and daily health metrics, with recipe and
//! meal nutrition kept up to date by an explicit recalculation cascade.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
