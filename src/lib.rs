//! mooring - idempotent database bootstrap for Temporal cluster deployments
//!
//! A toolkit that stands up the two databases a Temporal server requires on
//! a managed SQL cluster: it creates them idempotently, applies the
//! baseline schema and versioned migrations through the external
//! `temporal-sql-tool`, and tolerates being invoked any number of times by
//! a provisioning framework.
//!
//! # Architecture
//!
//! The hard part is narrow, so the system is one coordinating procedure
//! plus its collaborators:
//! - A connectivity prober polls an endpoint until it accepts TCP
//!   connections or a deadline elapses
//! - A schema tool adapter runs the external utility and classifies its
//!   output, reconstructing idempotence the tool does not natively offer
//! - The bootstrapper walks both databases through a fixed state machine,
//!   primary first
//! - A lifecycle adapter maps provisioning-framework events onto the
//!   bootstrapper (and maps deletion to a deliberate no-op)
//!
//! # Modules
//!
//! - `adapters`: External system integrations (schema tool, secret store)
//! - `core`: Bootstrap logic (probe, classify, bootstrap, lifecycle, manifest)
//! - `domain`: Data structures (endpoint, database, event, report)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap a deployment described by a manifest
//! mooring bootstrap --manifest deploy.yaml
//!
//! # Handle one lifecycle event
//! mooring handle-event --event create.json
//!
//! # Check endpoint reachability
//! mooring probe db.example 5432
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::adapters::{SchemaTool, SecretStore, SqlToolCli, ToolError, ToolOp, ToolOutcome};
pub use crate::core::{
    Bootstrapper, BootstrapSettings, DeploymentManifest, ErrorClass, LifecycleHandler,
    MatchPatterns, Prober, TcpProber, WaitSettings,
};
pub use crate::domain::{
    BootstrapReport, Credentials, DatastoreEndpoint, LifecycleEvent, LifecycleResponse,
    LogicalDatabase, RequestType, SchemaCategory, StorePlugin,
};
