//! Bucket Voting node
//!
//! Serves budgeted vote distribution to a page host over HTTP, backed by a
//! persistent vote store.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB-backed [`bucketvote_core::VoteStore`]
//! - **API**: HTTP endpoints running the voting directives per request
//! - **Admin Socket**: Unix socket for local operator commands (vote-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use bucketvote_node::{VoteConfig, VoteNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VoteConfig::from_env()?;
//!     let node = VoteNode::new(config)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod error;
pub mod node;
pub mod storage;

pub use error::{Error, Result};
pub use node::{VoteConfig, VoteNode, VoteState};
pub use storage::Storage;
