//! Domain types for the mooring bootstrap toolkit.
//!
//! This module contains the core data structures:
//! - Endpoint: datastore endpoint, engine plugin, credentials
//! - Database: logical databases and schema categories
//! - Event: lifecycle events from the provisioning framework
//! - Report: per-invocation bootstrap outcome

pub mod database;
pub mod endpoint;
pub mod event;
pub mod report;

// Re-export commonly used types
pub use database::{
    versioned_schema_dir, visibility_database_name, LogicalDatabase, SchemaCategory,
};
pub use endpoint::{Credentials, DatastoreEndpoint, StorePlugin};
pub use event::{
    LifecycleEvent, LifecycleResponse, RequestType, ResourceProperties, ValidatedProperties,
    ValidationError,
};
pub use report::{BootstrapReport, DatabaseOutcome};
