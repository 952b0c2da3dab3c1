//! SPBI dashboard - query gateway and dashboard actions for the SPBI
//! fuel-dispensing database.
//!
//! This library exposes the core modules for the CLI and integration tests.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
