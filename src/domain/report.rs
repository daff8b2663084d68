//! Per-invocation bootstrap outcome.
//!
//! A report exists only for the duration of one bootstrap run and is
//! returned to the caller; nothing is persisted. Re-invocation always
//! restarts the state machine from the top.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one full two-database bootstrap invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Identifier for this invocation (log correlation only)
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-database outcomes, in bootstrap order (primary first)
    pub databases: Vec<DatabaseOutcome>,
}

impl BootstrapReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            databases: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: DatabaseOutcome) {
        self.databases.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// What happened to one logical database during a bootstrap run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseOutcome {
    pub name: String,

    /// False when the database already existed on the cluster
    pub created: bool,

    /// False when the schema was already at the target version
    pub schema_updated: bool,
}
