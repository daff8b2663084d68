//! Classification of schema tool output.
//!
//! The external tool has no native idempotent mode, so idempotence is
//! reconstructed by matching its error output: a non-zero exit whose output
//! says the work was already done is a success, everything else is sorted
//! into a retry class. The match tables are configuration, not constants;
//! they can be overridden from the config file to survive tool-version
//! drift in phrasing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::StorePlugin;

/// Retry class for a non-zero tool exit that was not "already done".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The database is not yet reachable or not yet provisioned; worth a
    /// long wait before retrying.
    Connectivity,

    /// A genuine failure (authentication, permissions, broken migration).
    /// Never retried.
    Fatal,

    /// Anything unrecognized; retried after a shorter wait.
    Other,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Fatal => "fatal",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match tables applied to combined stdout/stderr of the schema tool.
///
/// All matching is case-insensitive substring search. The defaults are kept
/// permissive enough to survive phrasing drift between tool versions but
/// must never swallow genuine failures; authentication errors, disk full
/// and migration syntax errors stay unmatched and abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPatterns {
    /// Phrases meaning a CREATE DATABASE target already exists. The
    /// engine-specific duplicate phrase from the plugin is checked as well.
    #[serde(default = "default_create_already_exists")]
    pub create_already_exists: Vec<String>,

    /// Phrases meaning a schema operation found nothing left to do
    #[serde(default = "default_schema_already_applied")]
    pub schema_already_applied: Vec<String>,

    /// Phrases meaning the database is not yet reachable or provisioned
    #[serde(default = "default_connectivity")]
    pub connectivity: Vec<String>,

    /// Phrases that must abort immediately, with no further retries
    #[serde(default = "default_fatal")]
    pub fatal: Vec<String>,
}

fn default_create_already_exists() -> Vec<String> {
    vec!["already exists".to_string()]
}

fn default_schema_already_applied() -> Vec<String> {
    vec![
        "already exists".to_string(),
        "up to date".to_string(),
        "no migration".to_string(),
    ]
}

fn default_connectivity() -> Vec<String> {
    vec![
        "connection refused".to_string(),
        "connection reset".to_string(),
        "does not exist".to_string(),
        "no such host".to_string(),
        "i/o timeout".to_string(),
        "dial tcp".to_string(),
        "failed to connect".to_string(),
    ]
}

fn default_fatal() -> Vec<String> {
    vec![
        "permission denied".to_string(),
        "authentication".to_string(),
        "access denied".to_string(),
        "password".to_string(),
        "syntax error".to_string(),
        "no space left".to_string(),
    ]
}

impl Default for MatchPatterns {
    fn default() -> Self {
        Self {
            create_already_exists: default_create_already_exists(),
            schema_already_applied: default_schema_already_applied(),
            connectivity: default_connectivity(),
            fatal: default_fatal(),
        }
    }
}

impl MatchPatterns {
    /// Did a failed CREATE DATABASE actually report a pre-existing target?
    pub fn create_already_exists(&self, plugin: StorePlugin, output: &str) -> bool {
        let lowered = output.to_lowercase();
        self.create_already_exists
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
            || lowered.contains(plugin.duplicate_database_phrase())
    }

    /// Did a failed schema operation report already-applied state?
    pub fn schema_already_applied(&self, output: &str) -> bool {
        let lowered = output.to_lowercase();
        self.schema_already_applied
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
    }

    /// Sort an unrecognized failure into a retry class.
    ///
    /// Fatal phrases win over connectivity phrases: an authentication error
    /// mentioning a connection string must still abort.
    pub fn error_class(&self, output: &str) -> ErrorClass {
        let lowered = output.to_lowercase();

        if self.fatal.iter().any(|p| lowered.contains(&p.to_lowercase())) {
            return ErrorClass::Fatal;
        }
        if self
            .connectivity
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
        {
            return ErrorClass::Connectivity;
        }
        ErrorClass::Other
    }
}
