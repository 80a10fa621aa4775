//! The daemon's HTTP control surface: read-only views over ceremony state, kept separate from the
//! dispatcher so HTTP handlers never touch machine state directly, only the snapshots it publishes.

use crate::dispatcher::CeremonySnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::{collections::HashMap, net::SocketAddr};
use tokio::{net::TcpListener, sync::watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Serves `GET /healthz` and `GET /ceremonies/:id` over a snapshot feed published by the
/// dispatcher.
pub struct ControlSurface {
    router: Router,
}

impl ControlSurface {
    /// Build the control surface over a feed of ceremony snapshots, keyed by ceremony id.
    pub fn new(snapshots: watch::Receiver<HashMap<String, CeremonySnapshot>>) -> Self {
        let router = Router::new()
            .route("/healthz", get(healthz))
            .route("/ceremonies/:id", get(get_ceremony))
            .with_state(snapshots);
        Self { router }
    }

    /// Serve the control surface on `address` until `cancel` fires.
    pub async fn serve(self, address: SocketAddr, cancel: CancellationToken) -> std::io::Result<()> {
        info!("launching HTTP control surface on {address}");
        let listener = TcpListener::bind(address).await?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
    }
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn get_ceremony(
    State(snapshots): State<watch::Receiver<HashMap<String, CeremonySnapshot>>>,
    Path(ceremony_id): Path<String>,
) -> Result<Json<CeremonySnapshot>, StatusCode> {
    let snapshots = snapshots.borrow();
    match snapshots.get(&ceremony_id) {
        Some(snapshot) => Ok(Json(snapshot.clone())),
        None => {
            debug!(ceremony_id, "requested ceremony has no snapshot yet");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::watch;

    #[tokio::test]
    async fn healthz_returns_ok() {
        let (_tx, rx) = watch::channel(HashMap::new());
        let surface = ControlSurface::new(rx);
        let cancel = CancellationToken::new();
        cancel.cancel();
        // A cancelled token makes `serve` return as soon as the listener binds, which is enough
        // to confirm the router builds and the address binds without error.
        let address: SocketAddr = "127.0.0.1:0".parse().expect("valid address");
        surface.serve(address, cancel).await.expect("serve exits cleanly on cancellation");
    }
}
