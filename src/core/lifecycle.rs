//! Custom-resource lifecycle adapter.
//!
//! Exposes the bootstrapper as a single idempotent operation for the
//! surrounding provisioning framework. Create and update events for the
//! primary database run the full two-database bootstrap; visibility events
//! and delete events are deliberate no-ops.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::adapters::SecretStore;
use crate::core::bootstrap::Bootstrapper;
use crate::domain::{
    versioned_schema_dir, visibility_database_name, DatastoreEndpoint, LifecycleEvent,
    LifecycleResponse, LogicalDatabase, RequestType, SchemaCategory, ValidatedProperties,
};

/// Stable resource identifier derived from endpoint and database name.
///
/// The same deployment always yields the same id, so repeated invocations
/// report the same resource to the framework.
pub fn physical_resource_id(endpoint: &DatastoreEndpoint, database: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.addr().as_bytes());
    hasher.update(b"/");
    hasher.update(database.as_bytes());
    let digest = hasher.finalize();

    // First 16 hex chars (8 bytes) are plenty for uniqueness here
    format!("mooring-{}", hex::encode(&digest[..8]))
}

/// Handles lifecycle events from the provisioning framework.
///
/// Constructed once per deployment and shared by reference across the
/// logical-database resources; collaborators are injected explicitly.
pub struct LifecycleHandler {
    bootstrapper: Bootstrapper,
    secrets: Arc<dyn SecretStore>,

    /// Root of the schema tree shipped alongside the external tool
    schema_root: PathBuf,
}

impl LifecycleHandler {
    pub fn new(
        bootstrapper: Bootstrapper,
        secrets: Arc<dyn SecretStore>,
        schema_root: PathBuf,
    ) -> Self {
        Self {
            bootstrapper,
            secrets,
            schema_root,
        }
    }

    /// Handle one lifecycle event and produce the response.
    ///
    /// Validation happens synchronously before any network activity; a
    /// fatal error leaves the event failed for the framework to retry as a
    /// whole, which is always safe.
    #[instrument(skip_all, fields(request = ?event.request_type))]
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<LifecycleResponse> {
        if event.request_type == RequestType::Delete {
            return self.handle_delete(event);
        }

        let props = event
            .properties
            .validate()
            .context("lifecycle event failed validation")?;

        let resource_id = physical_resource_id(&props.endpoint, &props.database_name);

        if props.category == SchemaCategory::Visibility {
            // Both databases are bootstrapped from the primary's event, so
            // two independently-scheduled events never race on one cluster.
            info!(
                database = %props.database_name,
                "visibility resource is bootstrapped by the primary event, nothing to do"
            );
            return Ok(LifecycleResponse {
                physical_resource_id: resource_id,
            });
        }

        info!(
            database = %props.database_name,
            version_tag = %props.version_tag,
            "bootstrapping both databases from the primary event"
        );

        // Resolved fresh on every invocation, never cached
        let credentials = self
            .secrets
            .resolve(&props.endpoint.credential_ref)
            .await
            .with_context(|| {
                format!(
                    "failed to resolve credentials for '{}'",
                    props.endpoint.credential_ref
                )
            })?;

        let databases = self.plan_databases(&props);
        self.bootstrapper
            .run(&props.endpoint, &credentials, &databases)
            .await?;

        Ok(LifecycleResponse {
            physical_resource_id: resource_id,
        })
    }

    /// Deletion never touches the database: destroying a workflow-state
    /// database on stack teardown is unrecoverable, so the databases are
    /// deliberately leaked.
    fn handle_delete(&self, event: &LifecycleEvent) -> Result<LifecycleResponse> {
        info!("delete event is a no-op, databases are preserved");

        if let Some(id) = &event.physical_resource_id {
            return Ok(LifecycleResponse {
                physical_resource_id: id.clone(),
            });
        }

        // Some frameworks do not echo the prior id; fall back to deriving
        // it so the response stays stable.
        let props = event
            .properties
            .validate()
            .context("delete event carried neither a resource id nor valid properties")?;

        Ok(LifecycleResponse {
            physical_resource_id: physical_resource_id(&props.endpoint, &props.database_name),
        })
    }

    /// Both logical databases for one deployment, primary first. The
    /// visibility name and both schema directories follow the shipped
    /// conventions.
    fn plan_databases(&self, props: &ValidatedProperties) -> Vec<LogicalDatabase> {
        let plugin = props.endpoint.plugin;

        vec![
            LogicalDatabase::new(
                props.database_name.clone(),
                SchemaCategory::Main,
                versioned_schema_dir(&self.schema_root, plugin, SchemaCategory::Main),
            ),
            LogicalDatabase::new(
                visibility_database_name(&props.database_name),
                SchemaCategory::Visibility,
                versioned_schema_dir(&self.schema_root, plugin, SchemaCategory::Visibility),
            ),
        ]
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

    #[test]
    fn test_resource_id_is_stable() {
        let a = physical_resource_id(&endpoint(), "temporal");
        let b = physical_resource_id(&endpoint(), "temporal");
        assert_eq!(a, b);
        assert!(a.starts_with("mooring-"));
        assert_eq!(a.len(), "mooring-".len() + 16);
    }

    #[test]
    fn test_resource_id_varies_with_inputs() {
        let base = physical_resource_id(&endpoint(), "temporal");

        let mut other = endpoint();
        other.port = 5433;
        assert_ne!(base, physical_resource_id(&other, "temporal"));

        assert_ne!(base, physical_resource_id(&endpoint(), "temporal_visibility"));
    }
}
