//! The configuration for a coordination daemon.

use config::ConfigError;
use dkg_fsm::Deadlines;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, time::Duration};

/// The top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// The username under which this daemon's long-term keypair is stored.
    pub username: String,

    /// The HTTP control surface's bind address.
    pub listen_address: SocketAddr,

    /// The dump store's location.
    pub state_dbdsn: PathBuf,

    /// The log transport's endpoint.
    pub storage_dbdsn: String,

    /// The log topic this daemon reads and writes.
    pub storage_topic: String,

    /// The key store's location.
    pub keystore_dbdsn: PathBuf,

    /// QR frame delay, in 1/100s.
    #[serde(default = "default_frames_delay")]
    pub frames_delay: u32,

    /// QR chunk size, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// The minimum number of participants a ceremony can be proposed with.
    #[serde(default = "default_participants_min_count")]
    pub participants_min_count: u32,

    /// Per-phase confirmation deadlines.
    #[serde(default)]
    pub deadlines: DeadlinesConfig,

    /// The metrics configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,

    /// The tracing configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracing: Option<TracingConfig>,
}

impl Config {
    /// Load the configuration from a path.
    ///
    /// Any of the configuration properties can also be overridden by using environment variables.
    ///
    /// For example, the `listen_address` property can be set by using `LISTEN_ADDRESS=0.0.0.0:8080`
    /// and `deadlines.signature_confirmation` by using `DEADLINES__SIGNATURE_CONFIRMATION=60s`. Note
    /// the double underscores to delimit segments and single underscores to refer to fields.
    pub fn new(path: PathBuf) -> Result<Self, ConfigError> {
        let source = config::File::from(path).format(config::FileFormat::Yaml);
        let config = config::Config::builder()
            .add_source(source)
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        config.try_deserialize()
    }
}

/// Per-phase confirmation deadlines, mirroring [`Deadlines`] field for field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadlinesConfig {
    /// Deadline for the signature-proposal machine's invitation confirmations.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub signature_confirmation: Duration,

    /// Deadline for the DKG-proposal machine's pub-key phase.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub pubkey_confirmation: Duration,

    /// Deadline for the DKG-proposal machine's commit phase.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub commit_confirmation: Duration,

    /// Deadline for the DKG-proposal machine's deal phase.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub deal_confirmation: Duration,

    /// Deadline for the DKG-proposal machine's response phase.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub response_confirmation: Duration,

    /// Deadline for the DKG-proposal machine's master-key phase.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub master_key_confirmation: Duration,

    /// Deadline for the signing-proposal machine's confirmation and partial-key phases.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub signing_confirmation: Duration,
}

impl Default for DeadlinesConfig {
    fn default() -> Self {
        let deadline = default_deadline();
        Self {
            signature_confirmation: deadline,
            pubkey_confirmation: deadline,
            commit_confirmation: deadline,
            deal_confirmation: deadline,
            response_confirmation: deadline,
            master_key_confirmation: deadline,
            signing_confirmation: deadline,
        }
    }
}

impl From<DeadlinesConfig> for Deadlines {
    fn from(config: DeadlinesConfig) -> Self {
        Self {
            signature_confirmation_secs: config.signature_confirmation.as_secs() as i64,
            pub_key_confirmation_secs: config.pubkey_confirmation.as_secs() as i64,
            commit_confirmation_secs: config.commit_confirmation.as_secs() as i64,
            deal_confirmation_secs: config.deal_confirmation.as_secs() as i64,
            response_confirmation_secs: config.response_confirmation.as_secs() as i64,
            master_key_confirmation_secs: config.master_key_confirmation.as_secs() as i64,
            signing_confirmation_secs: config.signing_confirmation.as_secs() as i64,
        }
    }
}

fn default_deadline() -> Duration {
    Duration::from_secs(300)
}

fn default_frames_delay() -> u32 {
    10
}

fn default_chunk_size() -> u32 {
    256
}

fn default_participants_min_count() -> u32 {
    2
}

/// The metrics configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// The endpoint in which the prometheus metrics are exposed.
    pub listen_address: SocketAddr,

    /// The interval at which the process metrics collector runs.
    #[serde(with = "humantime_serde", default = "default_process_collector_interval")]
    pub process_collector_interval: Duration,

    /// The static labels to be used in every exposed metric.
    #[serde(default)]
    pub static_labels: HashMap<String, String>,
}

fn default_process_collector_interval() -> Duration {
    Duration::from_secs(30)
}

/// Configuration for tracing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TracingConfig {
    /// The path where to store the JSON traces.
    pub json_path: Option<PathBuf>,

    /// Whether to print output to standard output.
    #[serde(default)]
    pub stdout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlines_config_converts_to_fsm_deadlines() {
        let config = DeadlinesConfig { signature_confirmation: Duration::from_secs(42), ..DeadlinesConfig::default() };
        let deadlines: Deadlines = config.into();
        assert_eq!(deadlines.signature_confirmation_secs, 42);
        assert_eq!(deadlines.pub_key_confirmation_secs, 300);
    }
}
