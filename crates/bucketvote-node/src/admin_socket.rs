//! Unix socket server for operator commands.
//!
//! Anyone who can open the socket file acts as an operator: totals and item
//! deletion here skip the admin group check, so restrict the socket's
//! filesystem permissions accordingly.

use crate::error::Result;
use crate::storage::Storage;
use bucketvote_core::{ItemTotal, VoteStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Per-item totals of a session
    Totals { session_key: String },
    /// Delete an item's votes for all users
    DeleteItem {
        session_key: String,
        item_key: String,
    },
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    Totals { items: Vec<ItemTotal> },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    storage: Arc<Storage>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(storage: Arc<Storage>, socket_path: PathBuf) -> Self {
        Self {
            storage,
            socket_path,
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let storage = Arc::clone(&self.storage);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, storage).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, storage: Arc<Storage>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, storage.as_ref()),
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

fn execute_command<S: VoteStore + ?Sized>(cmd: AdminCommand, store: &S) -> AdminResponse {
    match cmd {
        AdminCommand::Totals { session_key } => match store.totals(&session_key) {
            Ok(items) => AdminResponse::Totals { items },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::DeleteItem {
            session_key,
            item_key,
        } => match store.delete_item_everywhere(&session_key, &item_key) {
            Ok(removed) => {
                tracing::info!(
                    session = %session_key,
                    item = %item_key,
                    removed,
                    "Operator deleted item"
                );
                AdminResponse::Ok {
                    message: format!("Deleted {} vote(s) for {:?}", removed, item_key),
                }
            }
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Ping => AdminResponse::Pong,
    }
}
