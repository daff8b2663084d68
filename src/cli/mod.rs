//! Command-line interface for mooring.
//!
//! Provides commands for running a full bootstrap from a manifest,
//! handling a single lifecycle event, probing an endpoint, and validating
//! configuration.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{EnvSecretStore, HttpSecretStore, SecretStore, SqlToolCli};
use crate::config::{config, ResolvedConfig};
use crate::core::{
    Bootstrapper, DeploymentManifest, LifecycleHandler, Prober, TcpProber,
};
use crate::domain::{LifecycleEvent, SchemaCategory};

/// mooring - idempotent database bootstrap for Temporal cluster deployments
#[derive(Parser, Debug)]
#[command(name = "mooring")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full two-database bootstrap from a deployment manifest
    Bootstrap {
        /// Path to the manifest YAML
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Handle one lifecycle event (reads JSON from a file or stdin)
    HandleEvent {
        /// Event file (reads from stdin if not provided)
        #[arg(short, long)]
        event: Option<PathBuf>,
    },

    /// Check whether an endpoint accepts TCP connections
    Probe {
        /// Hostname to probe
        host: String,

        /// Port to probe
        port: u16,

        /// Connect timeout in seconds
        #[arg(long, default_value = "10")]
        timeout_seconds: u64,
    },

    /// Validate a deployment manifest without side effects
    Validate {
        /// Path to the manifest YAML
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Bootstrap { manifest } => run_bootstrap(&manifest).await,
            Commands::HandleEvent { event } => handle_event(event).await,
            Commands::Probe {
                host,
                port,
                timeout_seconds,
            } => probe_endpoint(&host, port, timeout_seconds).await,
            Commands::Validate { manifest } => validate_manifest(&manifest),
            Commands::Config => show_config(),
        }
    }
}

/// Build the production schema tool adapter from resolved configuration
fn sql_tool(cfg: &ResolvedConfig) -> SqlToolCli {
    SqlToolCli::new(
        cfg.tool_binary.clone(),
        cfg.invoke_timeout(),
        cfg.patterns.clone(),
    )
}

/// Pick the secret store: HTTP when a store URL is configured, environment
/// variables otherwise
fn secret_store(cfg: &ResolvedConfig) -> Arc<dyn SecretStore> {
    match &cfg.secrets_url {
        Some(url) => Arc::new(HttpSecretStore::new(url.clone())),
        None => Arc::new(EnvSecretStore),
    }
}

/// Run a full bootstrap from a manifest
async fn run_bootstrap(manifest_path: &PathBuf) -> Result<()> {
    let cfg = config()?;

    let manifest = DeploymentManifest::from_file(manifest_path)?;
    manifest.validate()?;
    manifest.check_schema_dirs()?;

    let credentials = secret_store(cfg)
        .resolve(&manifest.endpoint.credential_ref)
        .await?;

    let bootstrapper = Bootstrapper::new(
        Arc::new(sql_tool(cfg)),
        Arc::new(TcpProber),
        manifest.settings.clone(),
    );

    let databases = manifest.ordered_databases();
    let report = bootstrapper
        .run(&manifest.endpoint, &credentials, &databases)
        .await?;

    for db in &report.databases {
        println!(
            "{}: {}, schema {}",
            db.name,
            if db.created { "created" } else { "already existed" },
            if db.schema_updated {
                "updated"
            } else {
                "already current"
            }
        );
    }
    eprintln!("[Bootstrap {} completed successfully]", report.run_id);

    Ok(())
}

/// Handle one lifecycle event and print the response as JSON
async fn handle_event(event_file: Option<PathBuf>) -> Result<()> {
    let raw = match event_file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read event file: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read event from stdin")?;
            buffer
        }
    };

    let event: LifecycleEvent =
        serde_json::from_str(&raw).context("Failed to parse lifecycle event JSON")?;

    let cfg = config()?;
    let bootstrapper = Bootstrapper::new(
        Arc::new(sql_tool(cfg)),
        Arc::new(TcpProber),
        Default::default(),
    );
    let handler = LifecycleHandler::new(bootstrapper, secret_store(cfg), cfg.schema_root.clone());

    let response = handler.handle(&event).await?;
    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}

/// One-shot reachability check
async fn probe_endpoint(host: &str, port: u16, timeout_seconds: u64) -> Result<()> {
    let reachable = TcpProber
        .probe(host, port, Duration::from_secs(timeout_seconds))
        .await;

    if reachable {
        println!("{}:{} is reachable", host, port);
        Ok(())
    } else {
        eprintln!("{}:{} is not reachable", host, port);
        std::process::exit(1);
    }
}

/// Validate a manifest without side effects
fn validate_manifest(manifest_path: &PathBuf) -> Result<()> {
    let manifest = DeploymentManifest::from_file(manifest_path)?;
    manifest.validate()?;

    let main = manifest
        .database(SchemaCategory::Main)
        .map(|db| db.name.as_str())
        .unwrap_or("?");
    let visibility = manifest
        .database(SchemaCategory::Visibility)
        .map(|db| db.name.as_str())
        .unwrap_or("?");

    println!(
        "Manifest OK: {} on {} (databases: {}, {})",
        manifest.endpoint.plugin,
        manifest.endpoint.addr(),
        main,
        visibility,
    );

    if let Err(e) = manifest.check_schema_dirs() {
        eprintln!("Warning: {}", e);
    }

    Ok(())
}

/// Show the resolved configuration
fn show_config() -> Result<()> {
    let cfg = config()?;

    println!("Tool binary:     {}", cfg.tool_binary);
    println!("Invoke timeout:  {}s", cfg.invoke_timeout_seconds);
    println!("Schema root:     {}", cfg.schema_root.display());
    println!(
        "Secret store:    {}",
        cfg.secrets_url.as_deref().unwrap_or("(environment)")
    );
    match &cfg.config_file {
        Some(path) => println!("Config file:     {}", path.display()),
        None => println!("Config file:     (none found, using defaults)"),
    }

    Ok(())
}
