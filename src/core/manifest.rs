//! Deployment manifests.
//!
//! A manifest is the operator-facing YAML description of one deployment:
//! the cluster endpoint, the two logical databases, and optional timing
//! overrides. The `bootstrap` and `validate` commands consume it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::bootstrap::BootstrapSettings;
use crate::domain::{DatastoreEndpoint, LogicalDatabase, SchemaCategory};

/// A complete deployment manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// Manifest schema version
    pub version: String,

    /// Cluster endpoint and credential reference
    pub endpoint: DatastoreEndpoint,

    /// The two logical databases
    pub databases: Vec<LogicalDatabase>,

    /// Timing and retry overrides
    #[serde(default)]
    pub settings: BootstrapSettings,
}

impl DeploymentManifest {
    /// Load a manifest from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a manifest from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse manifest YAML")
    }

    /// Validate the manifest before any network activity.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.host.trim().is_empty() {
            anyhow::bail!("Endpoint host cannot be empty");
        }
        if self.endpoint.credential_ref.trim().is_empty() {
            anyhow::bail!("Endpoint credential_ref cannot be empty");
        }

        for category in [SchemaCategory::Main, SchemaCategory::Visibility] {
            let count = self
                .databases
                .iter()
                .filter(|db| db.category == category)
                .count();
            if count != 1 {
                anyhow::bail!(
                    "Manifest must declare exactly one '{}' database, found {}",
                    category,
                    count
                );
            }
        }

        for (i, db) in self.databases.iter().enumerate() {
            if db.name.trim().is_empty() {
                anyhow::bail!("Database {} has an empty name", i);
            }
        }

        let main = self.database(SchemaCategory::Main);
        let visibility = self.database(SchemaCategory::Visibility);
        if let (Some(main), Some(visibility)) = (main, visibility) {
            if main.name == visibility.name {
                anyhow::bail!(
                    "Main and visibility databases must have distinct names, both are '{}'",
                    main.name
                );
            }
        }

        Ok(())
    }

    /// Check that both schema directories exist on disk.
    ///
    /// Separate from `validate` so manifests can be linted on machines
    /// that do not carry the schema tree.
    pub fn check_schema_dirs(&self) -> Result<()> {
        for db in &self.databases {
            if !db.schema_dir.is_dir() {
                anyhow::bail!(
                    "Schema directory for '{}' does not exist: {}",
                    db.name,
                    db.schema_dir.display()
                );
            }
        }
        Ok(())
    }

    /// Get the database declared for a category
    pub fn database(&self, category: SchemaCategory) -> Option<&LogicalDatabase> {
        self.databases.iter().find(|db| db.category == category)
    }

    /// Both databases in bootstrap order, primary first
    pub fn ordered_databases(&self) -> Vec<LogicalDatabase> {
        let mut ordered = self.databases.clone();
        ordered.sort_by_key(|db| match db.category {
            SchemaCategory::Main => 0,
            SchemaCategory::Visibility => 1,
        });
        ordered
    }
}
