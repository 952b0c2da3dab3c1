//! Connection configuration for the SPBI dashboard.
//!
//! The config store is a flat JSON object written by the admin tool:
//!
//! ```json
//! {
//!   "JDBC_DRIVER": "org.sqlite.JDBC",
//!   "JDBC_URL": "jdbc:sqlite:/var/lib/spbi/spbi.db",
//!   "USERNAME": "",
//!   "PASSWORD": "",
//!   "JAR_FILE": ""
//! }
//! ```
//!
//! A missing key loads as an empty string; callers check with
//! [`ConnectionDescriptor::validate`] before use.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hsqldb_config.json";

/// Everything needed to open a connection to the dashboard database.
///
/// Immutable once loaded; held for the lifetime of the process.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Driver identifier (JDBC class name or backend short name).
    #[serde(rename = "JDBC_DRIVER", default)]
    pub driver_id: String,

    /// Connection string, with or without a `jdbc:` prefix.
    #[serde(rename = "JDBC_URL", default)]
    pub connection_uri: String,

    /// Database user.
    #[serde(rename = "USERNAME", default)]
    pub username: String,

    /// Database password.
    #[serde(rename = "PASSWORD", default)]
    pub password: String,

    /// Location of the driver artifact, if the backend needs one.
    #[serde(rename = "JAR_FILE", default)]
    pub driver_artifact_path: String,
}

impl ConnectionDescriptor {
    /// Returns the default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Loads the descriptor from a JSON config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        Self::parse_json(&content, path)
    }

    /// Parses the descriptor from a JSON string.
    fn parse_json(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            DashboardError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Checks that the fields needed to open a connection are present.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.driver_id.trim().is_empty() {
            missing.push("JDBC_DRIVER");
        }
        if self.connection_uri.trim().is_empty() {
            missing.push("JDBC_URL");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DashboardError::config(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Returns the driver artifact path, if one is configured.
    pub fn driver_artifact(&self) -> Option<&Path> {
        let trimmed = self.driver_artifact_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Path::new(trimmed))
        }
    }

    /// Returns the connection URI with any embedded password masked.
    pub fn redacted_uri(&self) -> String {
        let (prefix, rest) = match self.connection_uri.strip_prefix("jdbc:") {
            Some(rest) => ("jdbc:", rest),
            None => ("", self.connection_uri.as_str()),
        };

        match Url::parse(rest) {
            Ok(mut url) if url.password().is_some() => {
                if url.set_password(Some("****")).is_err() {
                    return format!("{prefix}{}", url.scheme());
                }
                format!("{prefix}{url}")
            }
            _ => self.connection_uri.clone(),
        }
    }

    /// Returns a display-safe string (no password) for logs and status output.
    pub fn display_string(&self) -> String {
        let user = if self.username.is_empty() {
            String::new()
        } else {
            format!("{} @ ", self.username)
        };
        format!("{user}{} ({})", self.redacted_uri(), self.driver_id)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("driver_id", &self.driver_id)
            .field("connection_uri", &self.redacted_uri())
            .field("username", &self.username)
            .field("password", &"****")
            .field("driver_artifact_path", &self.driver_artifact_path)
            .finish()
    }
}
