//! Idempotent two-database bootstrapper.
//!
//! One invocation walks a fixed state machine over both logical databases
//! in sequence, primary first:
//!
//! ```text
//! WaitClusterReachable
//!   -> CreateDatabase(db) -> Settle -> WaitDatabaseReachable(db)
//!   -> SetupSchema(db) -> UpdateSchema(db) -> Done(db)      (per database)
//! -> AllDone
//! ```
//!
//! Every stage tolerates work that was already done on a previous
//! invocation, so the whole operation is safe to re-run from the top after
//! any failure. Partial application (primary bootstrapped, visibility
//! untouched) is an accepted failure mode and is never rolled back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{SchemaTool, ToolOp, ToolOutcome};
use crate::core::classify::ErrorClass;
use crate::core::probe::{wait_until_reachable, Prober, WaitSettings};
use crate::domain::{
    BootstrapReport, Credentials, DatabaseOutcome, DatastoreEndpoint, LogicalDatabase,
};

/// Phases of the bootstrap state machine, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitClusterReachable,
    CreateDatabase,
    Settle,
    WaitDatabaseReachable,
    SetupSchema,
    UpdateSchema,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitClusterReachable => "wait-cluster-reachable",
            Self::CreateDatabase => "create-database",
            Self::Settle => "settle",
            Self::WaitDatabaseReachable => "wait-database-reachable",
            Self::SetupSchema => "setup-schema",
            Self::UpdateSchema => "update-schema",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and retry settings for one bootstrap invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Wait profile for the cluster endpoint
    #[serde(default = "WaitSettings::cluster")]
    pub cluster_wait: WaitSettings,

    /// Wait profile for each database after creation
    #[serde(default = "WaitSettings::database")]
    pub database_wait: WaitSettings,

    /// Delay between database creation and schema work, letting the managed
    /// cluster's connection routing converge after the creation DDL. An
    /// empirically required wait, not a correctness-proof wait.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Retry settings for the two schema operations
    #[serde(default)]
    pub schema_retry: SchemaRetry,
}

fn default_settle_delay() -> u64 {
    120_000
} // 2 min

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            cluster_wait: WaitSettings::cluster(),
            database_wait: WaitSettings::database(),
            settle_delay_ms: default_settle_delay(),
            schema_retry: SchemaRetry::default(),
        }
    }
}

/// Retry policy for setup-schema and update-schema.
///
/// The wait between attempts depends on the error class: connectivity and
/// does-not-exist failures mean the database is not fully provisioned yet
/// and get the longer wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRetry {
    /// Attempt ceiling per operation (including the first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after a connectivity-class failure in milliseconds
    #[serde(default = "default_connectivity_wait")]
    pub connectivity_wait_ms: u64,

    /// Wait after any other retryable failure in milliseconds
    #[serde(default = "default_other_wait")]
    pub other_wait_ms: u64,
}

fn default_max_attempts() -> u32 {
    15
}
fn default_connectivity_wait() -> u64 {
    120_000
} // 2 min
fn default_other_wait() -> u64 {
    60_000
} // 1 min

impl Default for SchemaRetry {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            connectivity_wait_ms: default_connectivity_wait(),
            other_wait_ms: default_other_wait(),
        }
    }
}

impl SchemaRetry {
    pub fn wait_for(&self, class: ErrorClass) -> Duration {
        match class {
            ErrorClass::Connectivity => Duration::from_millis(self.connectivity_wait_ms),
            _ => Duration::from_millis(self.other_wait_ms),
        }
    }
}

/// The bootstrapper. Owns its collaborators; holds no state between
/// invocations.
pub struct Bootstrapper {
    tool: Arc<dyn SchemaTool>,
    prober: Arc<dyn Prober>,
    settings: BootstrapSettings,
}

impl Bootstrapper {
    pub fn new(
        tool: Arc<dyn SchemaTool>,
        prober: Arc<dyn Prober>,
        settings: BootstrapSettings,
    ) -> Self {
        Self {
            tool,
            prober,
            settings,
        }
    }

    /// Execute one full bootstrap over the given databases, in order.
    ///
    /// The caller passes the primary database first; there is no internal
    /// parallelism between databases.
    #[instrument(skip_all, fields(endpoint = %endpoint.addr()))]
    pub async fn run(
        &self,
        endpoint: &DatastoreEndpoint,
        credentials: &Credentials,
        databases: &[LogicalDatabase],
    ) -> Result<BootstrapReport> {
        let run_id = Uuid::new_v4();
        let mut report = BootstrapReport::new(run_id);

        info!(%run_id, phase = %Phase::WaitClusterReachable, "starting bootstrap");

        wait_until_reachable(
            self.prober.as_ref(),
            &endpoint.host,
            endpoint.port,
            &format!("cluster {}", endpoint.addr()),
            &self.settings.cluster_wait,
        )
        .await
        .context("cluster endpoint never became reachable")?;

        for db in databases {
            let outcome = self
                .bootstrap_database(endpoint, credentials, db)
                .await
                .with_context(|| format!("bootstrap of database '{}' failed", db.name))?;
            report.record(outcome);
        }

        report.finish();
        info!(%run_id, databases = databases.len(), "bootstrap complete");
        Ok(report)
    }

    /// Walk one database through create, settle, reachability, baseline
    /// schema, and migrations.
    async fn bootstrap_database(
        &self,
        endpoint: &DatastoreEndpoint,
        credentials: &Credentials,
        db: &LogicalDatabase,
    ) -> Result<DatabaseOutcome> {
        info!(phase = %Phase::CreateDatabase, database = %db.name, "creating database");

        // No retry loop here: the cluster endpoint was just probed
        // reachable, so any failure other than a pre-existing database is
        // fatal.
        let created = match self
            .tool
            .run(
                endpoint,
                credentials,
                &db.name,
                &ToolOp::CreateDatabase {
                    name: db.name.clone(),
                },
            )
            .await
        {
            Ok(ToolOutcome::Applied) => true,
            Ok(ToolOutcome::AlreadyApplied) => {
                info!(database = %db.name, "database already exists");
                false
            }
            Err(err) => {
                error!(database = %db.name, error = %err, "database creation failed");
                return Err(anyhow::Error::new(err).context("create-database failed"));
            }
        };

        let settle = Duration::from_millis(self.settings.settle_delay_ms);
        if !settle.is_zero() {
            info!(
                phase = %Phase::Settle,
                database = %db.name,
                delay_ms = settle.as_millis() as u64,
                "waiting for cluster routing to settle"
            );
            tokio::time::sleep(settle).await;
        }

        info!(phase = %Phase::WaitDatabaseReachable, database = %db.name, "probing database");
        wait_until_reachable(
            self.prober.as_ref(),
            &endpoint.host,
            endpoint.port,
            &format!("database {}", db.name),
            &self.settings.database_wait,
        )
        .await
        .with_context(|| format!("database '{}' never became reachable", db.name))?;

        self.run_schema_op(endpoint, credentials, db, Phase::SetupSchema, &ToolOp::SetupSchema)
            .await?;

        let updated = self
            .run_schema_op(
                endpoint,
                credentials,
                db,
                Phase::UpdateSchema,
                &ToolOp::UpdateSchema {
                    dir: db.schema_dir.clone(),
                },
            )
            .await?;

        info!(phase = %Phase::Done, database = %db.name, "database bootstrapped");

        Ok(DatabaseOutcome {
            name: db.name.clone(),
            created,
            schema_updated: updated == ToolOutcome::Applied,
        })
    }

    /// Run one schema operation with the bounded, class-aware retry loop.
    async fn run_schema_op(
        &self,
        endpoint: &DatastoreEndpoint,
        credentials: &Credentials,
        db: &LogicalDatabase,
        phase: Phase,
        op: &ToolOp,
    ) -> Result<ToolOutcome> {
        let retry = &self.settings.schema_retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!(phase = %phase, database = %db.name, attempt, "running schema operation");

            let err = match self.tool.run(endpoint, credentials, &db.name, op).await {
                Ok(ToolOutcome::Applied) => return Ok(ToolOutcome::Applied),
                Ok(ToolOutcome::AlreadyApplied) => {
                    info!(phase = %phase, database = %db.name, "schema already applied");
                    return Ok(ToolOutcome::AlreadyApplied);
                }
                Err(err) => err,
            };

            let class = err.class();

            if class == ErrorClass::Fatal {
                error!(
                    phase = %phase,
                    database = %db.name,
                    attempt,
                    error = %err,
                    "schema operation failed fatally"
                );
                return Err(anyhow::Error::new(err)
                    .context(format!("{} aborted on a fatal error", op.name())));
            }

            if attempt >= retry.max_attempts {
                error!(
                    phase = %phase,
                    database = %db.name,
                    attempt,
                    error = %err,
                    "schema operation exhausted its retry ceiling"
                );
                return Err(anyhow::Error::new(err).context(format!(
                    "{} failed after {} attempts",
                    op.name(),
                    attempt
                )));
            }

            let delay = retry.wait_for(class);
            warn!(
                phase = %phase,
                database = %db.name,
                attempt,
                class = %class,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "schema operation failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_recommendations() {
        let settings = BootstrapSettings::default();

        assert_eq!(settings.cluster_wait.overall_timeout_ms, 300_000);
        assert_eq!(settings.database_wait.overall_timeout_ms, 600_000);
        assert_eq!(settings.database_wait.max_delay_ms, 60_000);
        assert_eq!(settings.settle_delay_ms, 120_000);
        assert_eq!(settings.schema_retry.max_attempts, 15);
        assert_eq!(settings.schema_retry.connectivity_wait_ms, 120_000);
        assert_eq!(settings.schema_retry.other_wait_ms, 60_000);
    }

    #[test]
    fn test_retry_wait_by_class() {
        let retry = SchemaRetry::default();

        assert_eq!(
            retry.wait_for(ErrorClass::Connectivity),
            Duration::from_millis(120_000)
        );
        assert_eq!(
            retry.wait_for(ErrorClass::Other),
            Duration::from_millis(60_000)
        );
    }

    #[test]
    fn test_settings_yaml_overrides() {
        let yaml = r#"
settle_delay_ms: 0
schema_retry:
  max_attempts: 5
"#;
        let settings: BootstrapSettings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.settle_delay_ms, 0);
        assert_eq!(settings.schema_retry.max_attempts, 5);
        // Unset blocks keep their defaults
        assert_eq!(settings.schema_retry.other_wait_ms, 60_000);
        assert_eq!(settings.cluster_wait.overall_timeout_ms, 300_000);
    }
}
