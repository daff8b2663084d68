//! Adapter interfaces for external systems.
//!
//! Adapters provide a unified interface for the two external collaborators
//! this toolkit drives: the schema tool subprocess and the secret store.
//! Both sit behind traits so the bootstrapper and lifecycle handler can be
//! exercised against mocks.

pub mod secrets;
pub mod sql_tool;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::core::classify::ErrorClass;
use crate::domain::{Credentials, DatastoreEndpoint};

// Re-export the production adapters
pub use secrets::{EnvSecretStore, HttpSecretStore};
pub use sql_tool::SqlToolCli;

/// One of the three operations the schema tool supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOp {
    /// `create-database <name>`
    CreateDatabase { name: String },

    /// `setup-schema -v 0.0` (baseline, version zero)
    SetupSchema,

    /// `update-schema -d <directory>` (apply versioned migrations)
    UpdateSchema { dir: PathBuf },
}

impl ToolOp {
    /// Subcommand name, for flags and log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDatabase { .. } => "create-database",
            Self::SetupSchema => "setup-schema",
            Self::UpdateSchema { .. } => "update-schema",
        }
    }
}

/// Result of a successfully-classified tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool exited zero; the operation was applied
    Applied,

    /// The tool exited non-zero but its output says the work was already
    /// done; treated as success
    AlreadyApplied,
}

/// Failures from a tool invocation.
///
/// `Failed` carries the raw combined stdout/stderr verbatim so a failed
/// deployment surfaces the tool's own diagnosis to the operator.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run schema tool '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("schema tool {op} timed out after {timeout_secs}s")]
    Timeout { op: &'static str, timeout_secs: u64 },

    #[error("schema tool {op} failed with exit code {exit_code}: {output}")]
    Failed {
        op: &'static str,
        exit_code: i32,
        output: String,
        class: ErrorClass,
    },
}

impl ToolError {
    /// Retry class for this failure. Spawn failures are fatal (a missing
    /// binary will not appear by waiting); timeouts retry as ordinary
    /// failures.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Spawn { .. } => ErrorClass::Fatal,
            Self::Timeout { .. } => ErrorClass::Other,
            Self::Failed { class, .. } => *class,
        }
    }
}

/// Trait for the external schema utility.
#[async_trait]
pub trait SchemaTool: Send + Sync {
    /// Run one operation against one database and classify the result.
    async fn run(
        &self,
        endpoint: &DatastoreEndpoint,
        credentials: &Credentials,
        database: &str,
        op: &ToolOp,
    ) -> Result<ToolOutcome, ToolError>;
}

/// Trait for credential-reference resolution.
///
/// Implementations must resolve fresh on every call; credentials are never
/// cached across invocations.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<Credentials>;
}
