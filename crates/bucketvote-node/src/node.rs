//! Vote node - the service entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for the page host (directives, submissions, admin summary)
//! - Unix admin socket for local operator commands (vote-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::error::{Error, Result};
use crate::storage::Storage;
use bucketvote_core::DEFAULT_ADMIN_GROUP;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Configuration for a vote node.
#[derive(Debug, Clone)]
pub struct VoteConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Group whose members see totals and may delete items
    pub admin_group: String,

    /// Admin socket path (for vote-admin CLI)
    pub admin_socket: PathBuf,
}

impl Default for VoteConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./bucketvote-data");
        Self {
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            admin_group: DEFAULT_ADMIN_GROUP.to_string(),
        }
    }
}

impl VoteConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let data_dir = var("BUCKETVOTE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_addr = match var("BUCKETVOTE_API_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|e| Error::Config(format!("Invalid BUCKETVOTE_API_ADDR {addr:?}: {e}")))?,
            None => defaults.api_addr,
        };

        let admin_group = var("BUCKETVOTE_ADMIN_GROUP")
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or(defaults.admin_group);

        let admin_socket = var("BUCKETVOTE_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        Ok(Self {
            data_dir,
            api_addr,
            admin_group,
            admin_socket,
        })
    }
}

/// Shared state for the vote node - single storage instance shared by all components.
pub struct VoteState {
    pub storage: Arc<Storage>,
    pub config: VoteConfig,
}

/// A vote node instance.
pub struct VoteNode {
    state: Arc<VoteState>,
}

impl VoteNode {
    /// Create a new vote node.
    pub fn new(config: VoteConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(&config.data_dir)?);
        let state = Arc::new(VoteState { storage, config });

        Ok(Self { state })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<VoteState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts admin socket and HTTP server) until shutdown.
    pub async fn run(self) -> Result<()> {
        let config = &self.state.config;
        tracing::info!("Vote node starting");
        tracing::info!("  API: http://{}", config.api_addr);
        tracing::info!("  Admin: {:?}", config.admin_socket);
        tracing::info!("  Admin group: {}", config.admin_group);
        tracing::info!("  Data: {:?}", config.data_dir);

        let admin_socket = AdminSocket::new(
            Arc::clone(&self.state.storage),
            config.admin_socket.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        let app = api::build_router(self.state());

        let listener = TcpListener::bind(config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", config.api_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Vote node stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = VoteConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.admin_group, "sysop");
        assert_eq!(config.api_addr.port(), 8080);
        assert_eq!(config.admin_socket, PathBuf::from("./bucketvote-data/admin.sock"));
    }

    #[test]
    fn env_overrides() {
        let config = VoteConfig::from_lookup(lookup(&[
            ("BUCKETVOTE_DATA_DIR", "/var/lib/votes"),
            ("BUCKETVOTE_API_ADDR", "127.0.0.1:9090"),
            ("BUCKETVOTE_ADMIN_GROUP", "vote-managers"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/votes"));
        assert_eq!(config.api_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(config.admin_group, "vote-managers");
        assert_eq!(config.admin_socket, PathBuf::from("/var/lib/votes/admin.sock"));
    }

    #[test]
    fn blank_admin_group_falls_back() {
        let config =
            VoteConfig::from_lookup(lookup(&[("BUCKETVOTE_ADMIN_GROUP", "  ")])).unwrap();
        assert_eq!(config.admin_group, DEFAULT_ADMIN_GROUP);
    }

    #[test]
    fn invalid_addr_is_config_error() {
        let err = VoteConfig::from_lookup(lookup(&[("BUCKETVOTE_API_ADDR", "nowhere")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn node_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = VoteConfig {
            data_dir: dir.path().join("nested"),
            ..VoteConfig::default()
        };

        let node = VoteNode::new(config).unwrap();
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(node.state().config.admin_group, "sysop");
    }
}
