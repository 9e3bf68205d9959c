//! # Lookup JSON API
//!
//! The HTTP interface a lookup-role node serves: node status, dispatch
//! counters, and flat-file transaction record retrieval. The dispatch core
//! only knows the [`RpcListener`] contract — start listening, report a
//! boolean — so everything HTTP-shaped stays in this binary.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use lattice_protocol::identity::AccountAddress;
use lattice_protocol::txstore::{TxStoreError, TxnFileStore};
use lattice_protocol::{MessageRouter, NodeRole, RpcListener, StatsSnapshot, SyncMode};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Node version string.
    pub version: String,
    /// The role this node runs as.
    pub role: NodeRole,
    /// The startup sync mode.
    pub sync_mode: SyncMode,
    /// When the node came up.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Router owning the dispatch counters.
    pub router: Arc<MessageRouter>,
    /// Flat-file transaction record store.
    pub txstore: Arc<TxnFileStore>,
}

/// Builds the axum router for the lookup API.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/status", get(status_handler))
        .route("/stats", get(stats_handler))
        .route("/txn/:address", get(txn_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Response body for `/status`.
#[derive(Debug, Serialize)]
struct StatusResponse {
    version: String,
    role: String,
    sync_mode: String,
    uptime_secs: i64,
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: state.version.clone(),
        role: state.role.to_string(),
        sync_mode: state.sync_mode.to_string(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.router.stats())
}

/// Query parameters for `/txn/{address}`.
#[derive(Debug, Deserialize)]
struct TxnQuery {
    /// First record to read, 1-based.
    start: u64,
    /// Number of records to read.
    count: u64,
}

/// Response body for `/txn/{address}`.
#[derive(Debug, Serialize)]
struct TxnResponse {
    address: String,
    start: u64,
    count: u64,
    records_hex: String,
}

async fn txn_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<TxnQuery>,
) -> impl IntoResponse {
    let Some(address) = AccountAddress::from_hex(&address) else {
        return (StatusCode::BAD_REQUEST, "invalid address").into_response();
    };

    match state.txstore.fetch(&address, query.start, query.count) {
        Ok(records) => Json(TxnResponse {
            address: address.to_hex(),
            start: query.start,
            count: query.count,
            records_hex: hex::encode(records),
        })
        .into_response(),
        Err(TxStoreError::Missing(_)) => {
            (StatusCode::NOT_FOUND, "no records for address").into_response()
        }
        Err(e @ (TxStoreError::ZeroStart | TxStoreError::OutOfRange { .. })) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            error!("transaction fetch failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "fetch failed").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// [`RpcListener`] implementation over axum.
///
/// Binding happens synchronously inside `start_listening` so the boolean it
/// returns is honest; serving then runs on a spawned task for the life of
/// the process.
pub struct HttpRpcListener {
    addr: SocketAddr,
    router: Mutex<Option<axum::Router>>,
}

impl HttpRpcListener {
    /// Prepares a listener for the given address and router.
    pub fn new(addr: SocketAddr, router: axum::Router) -> Self {
        Self {
            addr,
            router: Mutex::new(Some(router)),
        }
    }
}

impl RpcListener for HttpRpcListener {
    fn start_listening(&self) -> bool {
        let Some(router) = self.router.lock().take() else {
            // Already started once.
            return false;
        };

        let std_listener = match std::net::TcpListener::bind(self.addr) {
            Ok(l) => l,
            Err(e) => {
                error!(addr = %self.addr, "failed to bind api listener: {}", e);
                return false;
            }
        };
        if let Err(e) = std_listener.set_nonblocking(true) {
            error!("failed to configure api listener: {}", e);
            return false;
        }

        let addr = self.addr;
        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::from_std(std_listener) {
                Ok(l) => l,
                Err(e) => {
                    error!("failed to adopt api listener: {}", e);
                    return;
                }
            };
            info!(%addr, "api server listening");
            if let Err(e) = axum::serve(listener, router).await {
                error!("api server error: {}", e);
            }
        });
        true
    }
}
