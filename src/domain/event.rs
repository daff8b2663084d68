//! Lifecycle events exchanged with the surrounding provisioning framework.
//!
//! Events arrive as loosely-typed JSON property bags. They are validated
//! into typed values at this boundary; nothing untyped propagates inward,
//! and validation failures are reported synchronously before any network
//! activity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::database::SchemaCategory;
use super::endpoint::{DatastoreEndpoint, StorePlugin};

/// Lifecycle request variants directed at a custom-managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// A single lifecycle event as received from the provisioning framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// What the framework is asking for
    pub request_type: RequestType,

    /// Resource id from a previous invocation (present on update/delete)
    #[serde(default)]
    pub physical_resource_id: Option<String>,

    /// Raw resource properties, validated before use
    #[serde(default)]
    pub properties: ResourceProperties,
}

/// The raw property bag attached to a lifecycle event.
///
/// All fields arrive as strings (the framework does not type its property
/// maps). Every field is optional here so that `validate` can report the
/// missing field by name instead of surfacing a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceProperties {
    #[serde(default)]
    pub plugin: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<String>,

    #[serde(default)]
    pub credential_ref: Option<String>,

    #[serde(default)]
    pub database_name: Option<String>,

    #[serde(default)]
    pub schema_category: Option<String>,

    /// Upstream server version. Unused beyond validation; it exists so a
    /// server upgrade changes the properties and forces re-invocation.
    #[serde(default)]
    pub version_tag: Option<String>,
}

impl ResourceProperties {
    /// Validate the property bag into typed values.
    pub fn validate(&self) -> Result<ValidatedProperties, ValidationError> {
        let plugin_str = require(&self.plugin, "plugin")?;
        let plugin: StorePlugin = plugin_str
            .parse()
            .map_err(|_| ValidationError::UnknownPlugin {
                value: plugin_str.to_string(),
            })?;

        let host = require(&self.host, "host")?.to_string();

        let port_str = require(&self.port, "port")?;
        let port: u16 = port_str.parse().map_err(|_| ValidationError::InvalidPort {
            value: port_str.to_string(),
        })?;

        let credential_ref = require(&self.credential_ref, "credential_ref")?.to_string();
        let database_name = require(&self.database_name, "database_name")?.to_string();

        let category_str = require(&self.schema_category, "schema_category")?;
        let category: SchemaCategory =
            category_str
                .parse()
                .map_err(|_| ValidationError::UnknownCategory {
                    value: category_str.to_string(),
                })?;

        let version_tag = require(&self.version_tag, "version_tag")?.to_string();

        Ok(ValidatedProperties {
            endpoint: DatastoreEndpoint {
                plugin,
                host,
                port,
                credential_ref,
            },
            database_name,
            category,
            version_tag,
        })
    }
}

fn require<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, ValidationError> {
    match field.as_deref() {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::MissingField { field: name }),
    }
}

/// Typed view of a validated property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProperties {
    pub endpoint: DatastoreEndpoint,
    pub database_name: String,
    pub category: SchemaCategory,
    pub version_tag: String,
}

/// Boundary validation failures. Always fatal, reported before any network
/// or subprocess activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required property '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid port '{value}'")]
    InvalidPort { value: String },

    #[error("unknown plugin '{value}' (expected 'postgres' or 'mysql')")]
    UnknownPlugin { value: String },

    #[error("unknown schema category '{value}' (expected 'main' or 'visibility')")]
    UnknownCategory { value: String },
}

/// Response returned to the provisioning framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleResponse {
    pub physical_resource_id: String,
}
