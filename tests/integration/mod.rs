//! Integration tests for the SPBI dashboard.

pub mod connection_test;
pub mod fixture;
pub mod gateway_test;
