//! Dashboard actions for the SPBI fuel-dispensing database.
//!
//! Maps each view of the dashboard to a parameterized statement and runs it
//! through the query gateway.

mod actions;
mod service;

pub use actions::{
    Action, DEFAULT_TRANSACTION_ROWS, MAX_TRANSACTION_ROWS, MIN_TRANSACTION_ROWS,
};
pub use service::{Dashboard, Outcome};
