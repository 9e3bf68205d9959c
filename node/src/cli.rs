//! # CLI Interface
//!
//! Defines the command-line argument structure for `lattice-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lattice_protocol::config::{
    DEFAULT_METRICS_PORT, DEFAULT_P2P_PORT, DEFAULT_RPC_PORT, DISPATCH_QUEUE_CAPACITY,
    WORKER_POOL_SIZE,
};
use lattice_protocol::{NodeRole, SyncMode};

/// LATTICE chain node.
///
/// Runs either as a full validator participant or as a lookup/archival
/// node. Ingests peer messages, routes them to protocol components, and —
/// in the lookup role — serves the JSON API.
#[derive(Parser, Debug)]
#[command(
    name = "lattice-node",
    about = "LATTICE chain node",
    version,
    propagate_version = true
)]
pub struct LatticeNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the LATTICE node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Initialize a new node — creates the data directory and generates
    /// a fresh identity keypair.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// CLI mirror of [`NodeRole`], so clap gets value parsing for free.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    /// Full participant node.
    Validator,
    /// Lookup/archival node with the RPC API.
    Lookup,
}

impl From<RoleArg> for NodeRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Validator => NodeRole::Validator,
            RoleArg::Lookup => NodeRole::Lookup,
        }
    }
}

/// CLI mirror of [`SyncMode`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SyncModeArg {
    /// No catch-up; initialize access control and go.
    NoSync,
    /// Join as a brand-new node.
    NewSync,
    /// Rejoin after downtime.
    NormalSync,
    /// Join as a directory committee member.
    DsSync,
    /// Lookup node catch-up.
    LookupSync,
}

impl From<SyncModeArg> for SyncMode {
    fn from(mode: SyncModeArg) -> Self {
        match mode {
            SyncModeArg::NoSync => SyncMode::NoSync,
            SyncModeArg::NewSync => SyncMode::NewSync,
            SyncModeArg::NormalSync => SyncMode::NormalSync,
            SyncModeArg::DsSync => SyncMode::DsSync,
            SyncModeArg::LookupSync => SyncMode::LookupSync,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Node role: validator (full participant) or lookup.
    #[arg(long, value_enum, env = "LATTICE_ROLE", default_value = "validator")]
    pub role: RoleArg,

    /// Startup synchronization mode.
    #[arg(long, value_enum, env = "LATTICE_SYNC_MODE", default_value = "no-sync")]
    pub sync_mode: SyncModeArg,

    /// Retrieve historical data before synchronizing. Incompatible with
    /// new-sync.
    #[arg(long, env = "LATTICE_RETRIEVE_HISTORY")]
    pub retrieve_history: bool,

    /// Path to the node data directory where the identity key and
    /// transaction records are stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "LATTICE_DATA_DIR", default_value = ".lattice")]
    pub data_dir: PathBuf,

    /// Port for P2P message ingestion.
    #[arg(long, env = "LATTICE_P2P_PORT", default_value_t = DEFAULT_P2P_PORT)]
    pub p2p_port: u16,

    /// Port for the JSON API (lookup role only).
    #[arg(long, env = "LATTICE_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "LATTICE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Dispatch queue capacity.
    #[arg(long, env = "LATTICE_QUEUE_CAPACITY", default_value_t = DISPATCH_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Worker pool concurrency.
    #[arg(long, env = "LATTICE_POOL_SIZE", default_value_t = WORKER_POOL_SIZE)]
    pub pool_size: usize,

    /// Hex-encoded Ed25519 identity secret key.
    ///
    /// If not provided, the node reads the key from the data directory.
    /// **Never pass this flag in production** — use the key file instead.
    #[arg(long, env = "LATTICE_IDENTITY_KEY")]
    pub identity_key: Option<String>,

    /// Diagnostic opt-in: dump raw key material to the debug log at
    /// startup. Devnet bring-up only.
    #[arg(long, env = "LATTICE_LOG_KEY_MATERIAL")]
    pub log_key_material: bool,

    /// Log output format: pretty or json.
    #[arg(long, env = "LATTICE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "LATTICE_DATA_DIR", default_value = ".lattice")]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        LatticeNodeCli::command().debug_assert();
    }

    #[test]
    fn role_and_mode_args_map_onto_protocol_types() {
        assert_eq!(NodeRole::from(RoleArg::Lookup), NodeRole::Lookup);
        assert_eq!(SyncMode::from(SyncModeArg::DsSync), SyncMode::DsSync);
    }
}
