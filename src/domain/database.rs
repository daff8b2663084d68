//! Logical databases and schema categories.
//!
//! A Temporal deployment needs exactly two databases on its SQL cluster:
//! the primary workflow-state database and the visibility database. Neither
//! is ever deleted by this toolkit.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::endpoint::StorePlugin;

/// Which of the two schema trees a database carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SchemaCategory {
    /// Primary workflow-state schema
    Main,

    /// Visibility/indexing schema
    Visibility,
}

impl SchemaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Visibility => "visibility",
        }
    }

    /// Category-specific directory component in the shipped schema tree.
    ///
    /// The tool ships its main schema under `temporal/` and the visibility
    /// schema under `visibility/`.
    pub fn schema_dir_component(self) -> &'static str {
        match self {
            Self::Main => "temporal",
            Self::Visibility => "visibility",
        }
    }
}

impl fmt::Display for SchemaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Self::Main),
            "visibility" => Ok(Self::Visibility),
            other => Err(format!(
                "unknown schema category '{}' (expected 'main' or 'visibility')",
                other
            )),
        }
    }
}

/// One of the two named databases the orchestration server requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalDatabase {
    /// Database name on the cluster
    pub name: String,

    /// Which schema tree it carries
    pub category: SchemaCategory,

    /// Directory holding the versioned migration files for this category
    pub schema_dir: PathBuf,
}

impl LogicalDatabase {
    pub fn new(name: impl Into<String>, category: SchemaCategory, schema_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            category,
            schema_dir,
        }
    }
}

/// Conventional versioned-migration directory for a plugin/category pair.
///
/// The schema tree ships alongside the external tool laid out as
/// `<root>/<engine>/<category>/versioned`, e.g.
/// `/etc/temporal/schema/postgresql/temporal/versioned`. The directory is
/// passed through to the tool opaquely; migration files are never parsed
/// here.
pub fn versioned_schema_dir(
    root: &Path,
    plugin: StorePlugin,
    category: SchemaCategory,
) -> PathBuf {
    root.join(plugin.schema_dir_component())
        .join(category.schema_dir_component())
        .join("versioned")
}

/// Conventional visibility database name derived from the primary name.
pub fn visibility_database_name(primary: &str) -> String {
    format!("{}_visibility", primary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!("main".parse::<SchemaCategory>(), Ok(SchemaCategory::Main));
        assert_eq!(
            "visibility".parse::<SchemaCategory>(),
            Ok(SchemaCategory::Visibility)
        );
        assert!("secondary".parse::<SchemaCategory>().is_err());
    }

    #[test]
    fn test_versioned_schema_dir_layout() {
        let dir = versioned_schema_dir(
            Path::new("/etc/temporal/schema"),
            StorePlugin::Postgres,
            SchemaCategory::Main,
        );
        assert_eq!(
            dir,
            PathBuf::from("/etc/temporal/schema/postgresql/temporal/versioned")
        );

        let dir = versioned_schema_dir(
            Path::new("/etc/temporal/schema"),
            StorePlugin::Mysql,
            SchemaCategory::Visibility,
        );
        assert_eq!(
            dir,
            PathBuf::from("/etc/temporal/schema/mysql/visibility/versioned")
        );
    }

    #[test]
    fn test_visibility_name_convention() {
        assert_eq!(visibility_database_name("temporal"), "temporal_visibility");
    }
}
