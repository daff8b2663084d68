//! Datastore endpoint, engine plugin, and credential types.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported SQL engine plugins for the schema tool.
///
/// This is a closed enumeration: unknown plugin names are rejected at the
/// boundary rather than passed through to the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StorePlugin {
    /// PostgreSQL (and compatible managed engines)
    Postgres,

    /// MySQL (and compatible managed engines)
    Mysql,
}

impl StorePlugin {
    /// Plugin name as passed to the schema tool's `--plugin` flag
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    /// Engine-specific directory component in the shipped schema tree
    pub fn schema_dir_component(self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::Mysql => "mysql",
        }
    }

    /// Engine-specific phrase emitted for a duplicate CREATE DATABASE.
    ///
    /// Postgres reports `database "x" already exists` / `duplicate
    /// database`; MySQL reports `Can't create database 'x'; database
    /// exists`.
    pub fn duplicate_database_phrase(self) -> &'static str {
        match self {
            Self::Postgres => "duplicate database",
            Self::Mysql => "database exists",
        }
    }

    /// Default wire port for the engine
    pub fn default_port(self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mysql => 3306,
        }
    }
}

impl fmt::Display for StorePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorePlugin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            other => Err(format!(
                "unknown plugin '{}' (expected 'postgres' or 'mysql')",
                other
            )),
        }
    }
}

/// A resolved datastore endpoint.
///
/// The credential reference is an opaque id for the external secret store;
/// it is resolved to a username/password pair at execution time and never
/// cached across invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreEndpoint {
    /// Engine plugin
    pub plugin: StorePlugin,

    /// Cluster hostname
    pub host: String,

    /// Cluster port
    pub port: u16,

    /// Reference id for credential resolution
    pub credential_ref: String,
}

impl DatastoreEndpoint {
    /// The `host:port` address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A resolved username/password pair.
///
/// Debug output redacts the password so credentials never reach log lines.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
