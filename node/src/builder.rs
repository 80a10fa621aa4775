//! Components in the node.

use crate::{
    dispatcher::{Dispatcher, IdentityResolver, InMemoryIdentityDirectory},
    http::ControlSurface,
    observability::{PrometheusExporter, process::ProcessMetricsCollector},
};
use anyhow::{anyhow, Context, Error};
use dkg_crypto::LongTermKeypair;
use dkg_store::{FileDumpStore, FileKeyStore, KeyEntry, KeyStore};
use dkg_transport::InMemoryLogTransport;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::oneshot, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(300);

/// A helper to construct the daemon's components.
pub struct NodeBuilder {
    config: node_config::Config,
}

impl NodeBuilder {
    /// Construct a new node builder for the given config.
    pub fn new(config: node_config::Config) -> Self {
        Self { config }
    }

    /// Generate a long-term keypair for the configured username and store it in the key store,
    /// without launching the daemon.
    pub async fn generate_keys(self) -> anyhow::Result<()> {
        let key_store = FileKeyStore::new(self.config.keystore_dbdsn.clone())?;
        let keypair = LongTermKeypair::generate();
        let entry = KeyEntry { public_key: keypair.public_key().as_bytes(), private_key: keypair.secret_bytes() };
        key_store.put(&self.config.username, entry).await?;
        info!(username = %self.config.username, "generated long-term keypair");
        Ok(())
    }

    /// Build and launch the node.
    pub async fn launch(self) -> anyhow::Result<NodeHandle> {
        let Self { config } = self;

        let key_store = FileKeyStore::new(config.keystore_dbdsn.clone())?;
        let entry = key_store
            .get(&config.username)
            .await?
            .ok_or_else(|| anyhow!("no keypair stored for username '{}'; run `gen_keys` first", config.username))?;
        let public_key = dkg_crypto::LongTermPublicKey::from_bytes(&entry.public_key)
            .map_err(|error| anyhow!("stored public key is invalid: {error}"))?;
        let fingerprint = dkg_crypto::fingerprint(&entry.public_key);

        let identities: Arc<dyn IdentityResolver> = Arc::new(InMemoryIdentityDirectory::new());
        identities.observe(fingerprint, public_key);

        let transport = Arc::new(InMemoryLogTransport::new());
        let dump_store = Arc::new(FileDumpStore::new(config.state_dbdsn.clone()).context("opening dump store")?);
        let deadlines: dkg_fsm::Deadlines = config.deadlines.clone().into();

        let dispatcher =
            Arc::new(Dispatcher::new(transport, dump_store, identities, deadlines, config.participants_min_count));

        let cancel_token = CancellationToken::new();

        let control_surface = ControlSurface::new(dispatcher.snapshots());
        let http_handle = tokio::spawn({
            let cancel_token = cancel_token.clone();
            let listen_address = config.listen_address;
            async move {
                if let Err(error) = control_surface.serve(listen_address, cancel_token).await {
                    error!(%error, "HTTP control surface failed");
                }
            }
        });

        let dispatcher_handle = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let cancel_token = cancel_token.clone();
            async move {
                if let Err(error) = dispatcher.run(cancel_token).await {
                    error!(%error, "dispatcher stopped on error");
                }
            }
        });

        let (sender, receiver) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if receiver.await.is_err() {
                error!("shutdown signal sender dropped");
            }
            cancel_token.cancel();
            let _ = http_handle.await;
            let _ = dispatcher_handle.await;
        });

        info!(username = %config.username, "node started");
        Ok(NodeHandle { handle, signal: sender })
    }

    /// Initialize the prometheus metrics exporter.
    pub async fn initialize_metrics(config: &node_config::MetricsConfig) -> Result<(), Error> {
        let hostname = hostname::get()?.to_string_lossy().to_string();
        let mut labels = HashMap::from([("hostname".to_string(), hostname)]);
        labels.extend(config.static_labels.clone());
        let exporter =
            PrometheusExporter::new(labels).map_err(|e| anyhow!("failed to create prometheus exporter: {e}"))?;
        let process_metrics_collector = ProcessMetricsCollector::default();
        let interval = config.process_collector_interval;
        tokio::spawn(async move { process_metrics_collector.run(interval).await });
        exporter.launch(config.listen_address);
        Ok(())
    }
}

/// A handle to a running instance of the node.
pub struct NodeHandle {
    handle: JoinHandle<()>,
    signal: oneshot::Sender<()>,
}

impl NodeHandle {
    /// Shutdown this node gracefully.
    pub async fn shutdown(self) {
        info!("sending the shutdown signal");
        if self.signal.send(()).is_err() {
            error!("shutdown signal receiver dropped");
            return;
        }
        match timeout(GRACEFUL_SHUTDOWN_TIMEOUT, self.handle).await {
            Ok(Ok(_)) => info!("node has shut down"),
            Ok(Err(_)) => info!("node failed to shut down cleanly"),
            Err(_) => info!("timed out waiting for node to shut down"),
        }
    }
}
