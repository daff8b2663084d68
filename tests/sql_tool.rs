//! Schema Tool Subprocess Integration Tests
//!
//! Runs the real subprocess adapter against executable mock scripts:
//! exit-status handling, combined output capture, already-exists and
//! fatal classification, and the per-invocation timeout.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use mooring::adapters::{SchemaTool, SqlToolCli, ToolError, ToolOp, ToolOutcome};
use mooring::core::{ErrorClass, MatchPatterns};
use mooring::domain::{Credentials, DatastoreEndpoint, StorePlugin};
use tempfile::TempDir;

fn endpoint() -> DatastoreEndpoint {
    DatastoreEndpoint {
        plugin: StorePlugin::Postgres,
        host: "db.example".to_string(),
        port: 5432,
        credential_ref: "prod/temporal-db".to_string(),
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "temporal".to_string(),
        password: "secret".to_string(),
    }
}

/// Write an executable mock tool script into the temp dir
fn mock_tool(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();

    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();

    path
}

fn tool(path: &PathBuf) -> SqlToolCli {
    SqlToolCli::new(
        path.display().to_string(),
        Duration::from_secs(5),
        MatchPatterns::default(),
    )
}

fn create_op() -> ToolOp {
    ToolOp::CreateDatabase {
        name: "temporal".to_string(),
    }
}

#[tokio::test]
async fn test_exit_zero_is_applied() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(&dir, "ok-tool", "exit 0");

    let outcome = tool(&script)
        .run(&endpoint(), &credentials(), "temporal", &create_op())
        .await
        .unwrap();

    assert_eq!(outcome, ToolOutcome::Applied);
}

#[tokio::test]
async fn test_already_exists_on_stderr_is_success() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(
        &dir,
        "dup-tool",
        r#"echo 'ERROR: database "temporal" already exists' >&2
exit 1"#,
    );

    let outcome = tool(&script)
        .run(&endpoint(), &credentials(), "temporal", &create_op())
        .await
        .unwrap();

    assert_eq!(outcome, ToolOutcome::AlreadyApplied);
}

#[tokio::test]
async fn test_up_to_date_schema_is_success() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(
        &dir,
        "current-tool",
        "echo 'schema is up to date, nothing to do'\nexit 1",
    );

    let outcome = tool(&script)
        .run(&endpoint(), &credentials(), "temporal", &ToolOp::SetupSchema)
        .await
        .unwrap();

    assert_eq!(outcome, ToolOutcome::AlreadyApplied);
}

#[tokio::test]
async fn test_permission_denied_is_fatal_with_raw_output() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(
        &dir,
        "denied-tool",
        "echo 'pq: permission denied for database temporal' >&2\nexit 1",
    );

    let err = tool(&script)
        .run(&endpoint(), &credentials(), "temporal", &ToolOp::SetupSchema)
        .await
        .unwrap_err();

    match err {
        ToolError::Failed {
            exit_code,
            ref output,
            class,
            ..
        } => {
            assert_eq!(exit_code, 1);
            assert!(output.contains("permission denied"));
            assert_eq!(class, ErrorClass::Fatal);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_classifies_as_connectivity() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(
        &dir,
        "refused-tool",
        "echo 'dial tcp 10.0.0.1:5432: connection refused' >&2\nexit 1",
    );

    let err = tool(&script)
        .run(&endpoint(), &credentials(), "temporal", &ToolOp::SetupSchema)
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Connectivity);
}

#[tokio::test]
async fn test_both_streams_are_captured() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(
        &dir,
        "chatty-tool",
        "echo 'starting migration'\necho 'pq: out of shared memory' >&2\nexit 2",
    );

    let err = tool(&script)
        .run(&endpoint(), &credentials(), "temporal", &ToolOp::SetupSchema)
        .await
        .unwrap_err();

    match err {
        ToolError::Failed {
            exit_code,
            ref output,
            ..
        } => {
            assert_eq!(exit_code, 2);
            assert!(output.contains("starting migration"));
            assert!(output.contains("out of shared memory"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_tool_hits_the_invocation_timeout() {
    let dir = TempDir::new().unwrap();
    let script = mock_tool(&dir, "slow-tool", "sleep 10");

    let tool = SqlToolCli::new(
        script.display().to_string(),
        Duration::from_millis(200),
        MatchPatterns::default(),
    );

    let err = tool
        .run(&endpoint(), &credentials(), "temporal", &ToolOp::SetupSchema)
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::Timeout { .. }));
}

#[tokio::test]
async fn test_missing_binary_is_a_spawn_error() {
    let err = SqlToolCli::with_binary("/nonexistent/temporal-sql-tool")
        .run(&endpoint(), &credentials(), "temporal", &create_op())
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::Spawn { .. }));
    assert_eq!(err.class(), ErrorClass::Fatal);
}

#[tokio::test]
async fn test_arguments_reach_the_subprocess() {
    let dir = TempDir::new().unwrap();
    let args_file = dir.path().join("args.txt");
    let script = mock_tool(
        &dir,
        "echo-tool",
        &format!("printf '%s\\n' \"$@\" > {}\nexit 0", args_file.display()),
    );

    tool(&script)
        .run(
            &endpoint(),
            &credentials(),
            "temporal",
            &ToolOp::UpdateSchema {
                dir: "/etc/temporal/schema/postgresql/temporal/versioned".into(),
            },
        )
        .await
        .unwrap();

    let recorded = std::fs::read_to_string(&args_file).unwrap();
    let args: Vec<&str> = recorded.lines().collect();

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
            "update-schema",
            "-d",
            "/etc/temporal/schema/postgresql/temporal/versioned",
        ]
    );
}
