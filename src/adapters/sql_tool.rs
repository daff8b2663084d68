//! Schema tool adapter, subprocess mode.
//!
//! Invokes the external `temporal-sql-tool` binary with connection flags
//! and one of the three supported operations, captures combined
//! stdout/stderr, and classifies the result.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{SchemaTool, ToolError, ToolOp, ToolOutcome};
use crate::core::classify::MatchPatterns;
use crate::domain::{Credentials, DatastoreEndpoint};

/// Default binary name, as shipped in the server image
pub const DEFAULT_TOOL_BINARY: &str = "temporal-sql-tool";

/// Default per-invocation timeout
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Schema tool adapter using subprocess mode.
pub struct SqlToolCli {
    /// Path to the tool binary
    binary: String,

    /// Per-invocation wall-clock limit
    invoke_timeout: Duration,

    /// Output match tables
    patterns: MatchPatterns,
}

impl Default for SqlToolCli {
    fn default() -> Self {
        Self::new(
            DEFAULT_TOOL_BINARY,
            DEFAULT_INVOKE_TIMEOUT,
            MatchPatterns::default(),
        )
    }
}

impl SqlToolCli {
    pub fn new(
        binary: impl Into<String>,
        invoke_timeout: Duration,
        patterns: MatchPatterns,
    ) -> Self {
        Self {
            binary: binary.into(),
            invoke_timeout,
            patterns,
        }
    }

    /// Create an adapter with a custom binary path and default settings
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self::new(binary, DEFAULT_INVOKE_TIMEOUT, MatchPatterns::default())
    }

    /// Argument vector for one invocation: connection flags first, then the
    /// operation subcommand and its arguments.
    pub fn command_args(
        endpoint: &DatastoreEndpoint,
        credentials: &Credentials,
        database: &str,
        op: &ToolOp,
    ) -> Vec<String> {
        let mut args = vec![
            "--plugin".to_string(),
            endpoint.plugin.as_str().to_string(),
            "--ep".to_string(),
            endpoint.host.clone(),
            "-p".to_string(),
            endpoint.port.to_string(),
            "-u".to_string(),
            credentials.username.clone(),
            "--pw".to_string(),
            credentials.password.clone(),
            "--db".to_string(),
            database.to_string(),
        ];

        match op {
            ToolOp::CreateDatabase { name } => {
                args.push("create-database".to_string());
                args.push(name.clone());
            }
            ToolOp::SetupSchema => {
                args.push("setup-schema".to_string());
                args.push("-v".to_string());
                args.push("0.0".to_string());
            }
            ToolOp::UpdateSchema { dir } => {
                args.push("update-schema".to_string());
                args.push("-d".to_string());
                args.push(dir.display().to_string());
            }
        }

        args
    }
}

#[async_trait]
impl SchemaTool for SqlToolCli {
    async fn run(
        &self,
        endpoint: &DatastoreEndpoint,
        credentials: &Credentials,
        database: &str,
        op: &ToolOp,
    ) -> Result<ToolOutcome, ToolError> {
        let args = Self::command_args(endpoint, credentials, database, op);

        debug!(op = op.name(), database, "invoking schema tool");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let output = timeout(self.invoke_timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                op: op.name(),
                timeout_secs: self.invoke_timeout.as_secs(),
            })?
            .map_err(|source| ToolError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        // The tool interleaves diagnostics across both streams; classify
        // against the combined text.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        let combined = combined.trim().to_string();

        if output.status.success() {
            debug!(op = op.name(), database, "schema tool succeeded");
            return Ok(ToolOutcome::Applied);
        }

        let exit_code = output.status.code().unwrap_or(-1);

        let already_done = match op {
            ToolOp::CreateDatabase { .. } => self
                .patterns
                .create_already_exists(endpoint.plugin, &combined),
            ToolOp::SetupSchema | ToolOp::UpdateSchema { .. } => {
                self.patterns.schema_already_applied(&combined)
            }
        };

        if already_done {
            info!(
                op = op.name(),
                database, "schema tool reported work already done, continuing"
            );
            return Ok(ToolOutcome::AlreadyApplied);
        }

        // Log unmatched non-zero exits verbatim so an operator can extend
        // the match tables instead of us guessing a new pattern.
        warn!(
            op = op.name(),
            database, exit_code, output = %combined, "schema tool failed"
        );

        let class = self.patterns.error_class(&combined);
        Err(ToolError::Failed {
            op: op.name(),
            exit_code,
            output: combined,
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StorePlugin;

    fn endpoint() -> DatastoreEndpoint {
        DatastoreEndpoint {
            plugin: StorePlugin::Postgres,
            host: "db.example".to_string(),
            port: 5432,
            credential_ref: "prod/db".to_string(),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "temporal".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_create_database_args() {
        let args = SqlToolCli::command_args(
            &endpoint(),
            &credentials(),
            "temporal",
            &ToolOp::CreateDatabase {
                name: "temporal".to_string(),
            },
        );

        assert_eq!(
            args,
            vec![
                "--plugin",
                "postgres",
                "--ep",
                "db.example",
                "-p",
                "5432",
                "-u",
                "temporal",
                "--pw",
                "secret",
                "--db",
                "temporal",
                "create-database",
                "temporal",
            ]
        );
    }

    #[test]
    fn test_setup_schema_args_pin_version_zero() {
        let args = SqlToolCli::command_args(
            &endpoint(),
            &credentials(),
            "temporal",
            &ToolOp::SetupSchema,
        );

        assert!(args.ends_with(&[
            "setup-schema".to_string(),
            "-v".to_string(),
            "0.0".to_string()
        ]));
    }

    #[test]
    fn test_update_schema_args_pass_directory_through() {
        let args = SqlToolCli::command_args(
            &endpoint(),
            &credentials(),
            "temporal_visibility",
            &ToolOp::UpdateSchema {
                dir: "/etc/temporal/schema/postgresql/visibility/versioned".into(),
            },
        );

        assert!(args.ends_with(&[
            "update-schema".to_string(),
            "-d".to_string(),
            "/etc/temporal/schema/postgresql/visibility/versioned".to_string()
        ]));
    }

    #[test]
    fn test_custom_binary_path() {
        let tool = SqlToolCli::with_binary("/opt/temporal/bin/temporal-sql-tool");
        assert_eq!(tool.binary, "/opt/temporal/bin/temporal-sql-tool");
    }

    // Subprocess behavior is covered by integration tests with executable
    // mock scripts in tests/sql_tool.rs.
}
