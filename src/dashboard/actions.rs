//! The dashboard's fixed set of actions and the statements they run.
//!
//! User input (card number filter, row count, release id) is validated here
//! and always travels as a bound parameter.

use crate::db::Statement;
use crate::error::{DashboardError, Result};
use serde::Serialize;

/// Smallest row count accepted for the transactions view.
pub const MIN_TRANSACTION_ROWS: u32 = 1;

/// Largest row count accepted for the transactions view.
pub const MAX_TRANSACTION_ROWS: u32 = 1000;

/// Row count used when none is given.
pub const DEFAULT_TRANSACTION_ROWS: u32 = 5;

const RELEASE_SQL: &str = "UPDATE trnquotacustomer SET processed = 0 WHERE id = ? AND processed = 1";

/// A dashboard action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// RFID-to-plate mappings, optionally for one card.
    RfidMap { cardno: Option<String> },

    /// Unprinted fuel transactions, optionally for one card.
    Transactions { limit: u32, cardno: Option<String> },

    /// The site's configured location.
    Location,

    /// Plates allowed to refuel.
    Plates,

    /// Plates stuck in the processed state that cannot refuel.
    StuckPlates,

    /// Clears the processed flag on one quota row.
    Release { id: i64 },
}

impl Action {
    /// RFID map view; a blank filter means every card.
    pub fn rfid_map(cardno: Option<&str>) -> Self {
        Self::RfidMap {
            cardno: normalize_filter(cardno),
        }
    }

    /// Transactions view with a validated row count.
    pub fn transactions(limit: u32, cardno: Option<&str>) -> Result<Self> {
        if !(MIN_TRANSACTION_ROWS..=MAX_TRANSACTION_ROWS).contains(&limit) {
            return Err(DashboardError::validation(format!(
                "row count must be between {MIN_TRANSACTION_ROWS} and {MAX_TRANSACTION_ROWS}, got {limit}"
            )));
        }
        Ok(Self::Transactions {
            limit,
            cardno: normalize_filter(cardno),
        })
    }

    /// Release action; `id` must be a non-empty integer.
    pub fn release(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DashboardError::validation("ID must not be empty"));
        }
        let id = id
            .parse::<i64>()
            .map_err(|_| DashboardError::validation(format!("ID must be numeric, got '{id}'")))?;
        Ok(Self::Release { id })
    }

    /// Heading shown above the action's output.
    pub fn title(&self) -> &'static str {
        match self {
            Self::RfidMap { .. } => "RFID map (trnrfidmap)",
            Self::Transactions { .. } => "Transactions (trntransactionfuel)",
            Self::Location => "Site location",
            Self::Plates => "Plates allowed to refuel",
            Self::StuckPlates => "Plates that cannot refuel (processed = 1)",
            Self::Release { .. } => "Release plate",
        }
    }

    /// True for actions that modify data.
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Release { .. })
    }

    /// Builds the statement for this action.
    pub fn statement(&self) -> Statement {
        match self {
            Self::RfidMap { cardno: None } => Statement::new("SELECT * FROM trnrfidmap"),
            Self::RfidMap {
                cardno: Some(cardno),
            } => Statement::new("SELECT * FROM trnrfidmap WHERE cardno = ?").bind(cardno.as_str()),
            Self::Transactions {
                limit,
                cardno: None,
            } => Statement::new("SELECT * FROM trntransactionfuel WHERE reprint = 0 LIMIT ?")
                .bind(*limit),
            Self::Transactions {
                limit,
                cardno: Some(cardno),
            } => Statement::new(
                "SELECT * FROM trntransactionfuel WHERE reprint = 0 AND cardno = ? LIMIT ?",
            )
            .bind(cardno.as_str())
            .bind(*limit),
            Self::Location => {
                Statement::new("SELECT value AS location FROM trnsitedetail WHERE id = 1")
            }
            Self::Plates => Statement::new("SELECT cardno AS nopol FROM trnquotacustomer"),
            Self::StuckPlates => {
                Statement::new("SELECT id, cardno FROM trnquotacustomer WHERE processed = 1")
            }
            // Only stuck rows are touched, so releasing twice reports zero rows.
            Self::Release { id } => Statement::new(RELEASE_SQL).bind(*id),
        }
    }
}

fn normalize_filter(cardno: Option<&str>) -> Option<String> {
    cardno
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
}
