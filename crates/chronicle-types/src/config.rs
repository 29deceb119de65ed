//! configuration types for chronicle

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Error;

/// main configuration for chronicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// address to bind the http server to.
    pub listen_addr: String,

    /// path to the server's ed25519 signing key file.
    pub signing_key_path: PathBuf,

    /// database for the default instance.
    pub database: DatabaseConfig,

    /// additional named instances, each with its own database.
    pub instances: BTreeMap<String, DatabaseConfig>,

    /// how far a signed request timestamp may drift from the server clock.
    pub request_timeout_secs: u64,

    /// interval between self-attestations of replica heads; unset disables.
    pub scheduled_attestation_secs: Option<u64>,

    /// interval of the background scheduled-task cycle in `serve`; 0 disables.
    pub schedule_interval_secs: u64,

    /// append a server-signed notice to the chain when a client is registered.
    pub publish_new_clients: bool,

    /// outbound peer requests.
    pub peer: PeerConfig,

    /// replication policy.
    pub replication: ReplicationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            signing_key_path: PathBuf::from("/var/lib/chronicle/signing-secret.key"),
            database: DatabaseConfig::default(),
            instances: BTreeMap::new(),
            request_timeout_secs: 600,
            scheduled_attestation_secs: None,
            schedule_interval_secs: 0,
            publish_new_clients: false,
            peer: PeerConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl Config {
    /// config for a named instance, or the default instance for `None`.
    pub fn for_instance(&self, name: Option<&str>) -> Result<Config, Error> {
        let Some(name) = name else {
            return Ok(self.clone());
        };
        let database = self
            .instances
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Config(format!("unknown instance: {}", name)))?;
        Ok(Config {
            database,
            ..self.clone()
        })
    }

    /// the default instance followed by every named instance.
    pub fn all_instances(&self) -> Vec<(Option<String>, Config)> {
        let mut out = vec![(None, self.clone())];
        for (name, database) in &self.instances {
            out.push((
                Some(name.clone()),
                Config {
                    database: database.clone(),
                    ..self.clone()
                },
            ));
        }
        out
    }
}

/// database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// database type: "sqlite" or "postgres".
    pub db_type: String,

    /// database connection string or file path.
    pub connection_string: String,

    /// sqlite-specific settings.
    pub sqlite: SqliteConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            connection_string: "/var/lib/chronicle/db.sqlite".to_string(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// sqlite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// enable write-ahead logging.
    pub write_ahead_log: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            write_ahead_log: true,
        }
    }
}

/// outbound peer request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// per-request timeout for replication and cross-sign calls.
    pub timeout_secs: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// replication policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// reject mirrored entries created further than this in the future.
    /// unset accepts any upstream timestamp.
    pub max_future_skew_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            listen_addr = "127.0.0.1:9000"
            scheduled_attestation_secs = 3600

            [database]
            connection_string = "/tmp/chronicle.sqlite"

            [instances.tenant-a]
            db_type = "sqlite"
            connection_string = "/tmp/tenant-a.sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.request_timeout_secs, 600);
        assert_eq!(config.database.db_type, "sqlite");
        assert!(config.database.sqlite.write_ahead_log);
        assert_eq!(config.scheduled_attestation_secs, Some(3600));
        assert_eq!(config.instances.len(), 1);
    }

    #[test]
    fn for_instance_swaps_database() {
        let mut config = Config::default();
        config.instances.insert(
            "tenant-a".to_string(),
            DatabaseConfig {
                connection_string: "/tmp/a.sqlite".to_string(),
                ..DatabaseConfig::default()
            },
        );

        let tenant = config.for_instance(Some("tenant-a")).unwrap();
        assert_eq!(tenant.database.connection_string, "/tmp/a.sqlite");
        assert_eq!(tenant.listen_addr, config.listen_addr);

        assert!(config.for_instance(Some("missing")).is_err());
        assert_eq!(config.all_instances().len(), 2);
    }
}
