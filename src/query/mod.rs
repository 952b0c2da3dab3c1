//! Query execution for the SPBI dashboard.
//!
//! Provides the connection-per-call query gateway.

mod gateway;

pub use gateway::QueryGateway;
