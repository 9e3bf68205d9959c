// Copyright (c) 2026 Lattice Works. MIT License.
// See LICENSE for details.

//! # LATTICE Node
//!
//! Entry point for the `lattice-node` binary. Parses CLI arguments,
//! initializes logging and metrics, assembles the dispatch core, runs the
//! TCP ingest loop, and — in the lookup role — serves the JSON API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the node
//! - `init`    — initialize data directory and generate the identity key
//! - `version` — print build version information

mod api;
mod cli;
mod components;
mod logging;
mod metrics;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::signal;

use lattice_protocol::access::NetworkContext;
use lattice_protocol::config::MAX_WIRE_MESSAGE_SIZE;
use lattice_protocol::identity::NodeIdentity;
use lattice_protocol::txstore::TxnFileStore;
use lattice_protocol::{
    ComponentTable, Mediator, MessageRouter, NodeOrchestrator, NodeRole, OrchestratorConfig, Peer,
    RpcListener, WireMessage,
};

use cli::{Commands, LatticeNodeCli};
use logging::LogFormat;
use metrics::{DispatchMetrics, MetricsState};

/// Name of the identity key file inside the data directory.
const IDENTITY_KEY_FILE: &str = "identity.key";

/// Subdirectory holding per-address transaction record files.
const TXN_DIR: &str = "txns";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LatticeNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full node: dispatch core, ingest loop, metrics endpoint,
/// and (lookup role) the JSON API.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "lattice_node=info,lattice_protocol=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        p2p_port = args.p2p_port,
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting lattice-node"
    );

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;

    // --- Identity ---
    let identity = load_identity(&args)?;

    // --- Dispatch core wiring ---
    let role = NodeRole::from(args.role);
    let sync_mode = lattice_protocol::SyncMode::from(args.sync_mode);
    let self_peer = Peer::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.p2p_port);

    let mediator = Mediator::new(NetworkContext::new());
    let shells = components::ShellComponent::full_set(&mediator);
    let table = ComponentTable::new(
        shells[0].clone(),
        shells[1].clone(),
        shells[2].clone(),
        shells[3].clone(),
        shells[4].clone(),
    );
    let router = Arc::new(MessageRouter::new(table));

    // --- Lookup API (constructed before the orchestrator, started by it) ---
    let txstore = Arc::new(TxnFileStore::new(args.data_dir.join(TXN_DIR)));
    let rpc_listener: Option<Arc<dyn RpcListener>> = if role == NodeRole::Lookup {
        let state = api::AppState {
            version: env!("CARGO_PKG_VERSION").to_string(),
            role,
            sync_mode,
            started_at: chrono::Utc::now(),
            router: Arc::clone(&router),
            txstore: Arc::clone(&txstore),
        };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.rpc_port);
        Some(Arc::new(api::HttpRpcListener::new(
            addr,
            api::create_router(state),
        )))
    } else {
        None
    };

    let mut config = OrchestratorConfig::new(role, sync_mode, self_peer);
    config.retrieve_history = args.retrieve_history;
    config.queue_capacity = args.queue_capacity;
    config.pool_size = args.pool_size;
    config.log_key_material = args.log_key_material;

    let orchestrator = Arc::new(NodeOrchestrator::new(
        config,
        &identity,
        mediator,
        Arc::clone(&router),
        rpc_listener,
    ));

    // --- Metrics server ---
    let node_metrics = Arc::new(DispatchMetrics::new());
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(MetricsState {
            metrics: Arc::clone(&node_metrics),
            router: Arc::clone(&router),
        });
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics server listening on {}", metrics_addr);

    // --- P2P ingest ---
    let ingest_addr = format!("0.0.0.0:{}", args.p2p_port);
    let ingest_listener = tokio::net::TcpListener::bind(&ingest_addr)
        .await
        .with_context(|| format!("failed to bind ingest listener on {}", ingest_addr))?;
    tracing::info!("p2p ingest listening on {}", ingest_addr);

    // --- Serve ---
    tokio::select! {
        res = ingest_loop(ingest_listener, Arc::clone(&orchestrator), Arc::clone(&node_metrics)) => {
            if let Err(e) = res {
                tracing::error!("ingest loop error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining dispatch core");
        }
    }

    orchestrator.shutdown().await;
    tracing::info!("lattice-node stopped");
    Ok(())
}

/// Accepts peer connections and feeds framed messages into the dispatch
/// core. One task per connection; each frame is a u32 big-endian length
/// prefix followed by that many payload bytes.
async fn ingest_loop(
    listener: tokio::net::TcpListener,
    orchestrator: Arc<NodeOrchestrator>,
    metrics: Arc<DispatchMetrics>,
) -> Result<()> {
    loop {
        let (stream, remote) = listener.accept().await?;
        let peer = Peer::from(remote);

        if !orchestrator
            .mediator()
            .network()
            .whitelist()
            .is_allowed(&peer)
        {
            tracing::warn!(%peer, "rejecting connection from non-whitelisted peer");
            continue;
        }

        let orchestrator = Arc::clone(&orchestrator);
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            if let Err(e) = read_frames(stream, peer, &orchestrator, &metrics).await {
                tracing::debug!(%peer, "connection closed: {}", e);
            }
        });
    }
}

/// Reads length-prefixed frames off one connection until EOF or a protocol
/// violation, dispatching each as a wire message.
async fn read_frames(
    mut stream: tokio::net::TcpStream,
    peer: Peer,
    orchestrator: &NodeOrchestrator,
    metrics: &DispatchMetrics,
) -> Result<()> {
    loop {
        let len = match stream.read_u32().await {
            Ok(len) => len as usize,
            // Clean EOF between frames is a normal disconnect.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if len > MAX_WIRE_MESSAGE_SIZE {
            anyhow::bail!("oversized frame ({} bytes) from {}", len, peer);
        }

        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;

        metrics.messages_ingested_total.inc();
        orchestrator.dispatch(WireMessage::new(payload, peer)).await;
    }
}

/// Loads the identity from the CLI flag or the data directory, generating
/// and persisting a fresh one on first run.
fn load_identity(args: &cli::RunArgs) -> Result<NodeIdentity> {
    if let Some(hex_key) = &args.identity_key {
        let bytes: [u8; 32] = hex::decode(hex_key)
            .context("identity key is not valid hex")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("identity key must be exactly 32 bytes"))?;
        return Ok(NodeIdentity::from_secret_bytes(&bytes));
    }

    let key_path = args.data_dir.join(IDENTITY_KEY_FILE);
    if key_path.exists() {
        let content = std::fs::read_to_string(&key_path)
            .with_context(|| format!("failed to read {}", key_path.display()))?;
        let bytes: [u8; 32] = hex::decode(content.trim())
            .context("stored identity key is not valid hex")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("stored identity key has the wrong length"))?;
        return Ok(NodeIdentity::from_secret_bytes(&bytes));
    }

    tracing::info!(path = %key_path.display(), "no identity key found, generating one");
    let identity = NodeIdentity::generate();
    persist_identity(&identity, &key_path)?;
    Ok(identity)
}

/// Writes the identity key file with owner-only permissions.
fn persist_identity(identity: &NodeIdentity, key_path: &std::path::Path) -> Result<()> {
    std::fs::write(key_path, hex::encode(identity.secret_key_bytes()))
        .with_context(|| format!("failed to write identity key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(key_path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Initializes a new node data directory and generates an identity keypair.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("lattice_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    std::fs::create_dir_all(data_dir.join(TXN_DIR))?;

    let identity = NodeIdentity::generate();
    let key_path = data_dir.join(IDENTITY_KEY_FILE);
    persist_identity(&identity, &key_path)?;

    tracing::info!(
        address = %identity.address(),
        key_path = %key_path.display(),
        "identity keypair generated"
    );

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Identity key   : {}", key_path.display());
    println!("  Account address: {}", identity.address());

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("lattice-node {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
