//! Vote node binary

use bucketvote_node::{VoteConfig, VoteNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucketvote_node=info,bucketvote_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vote node");

    let config = VoteConfig::from_env()?;
    let node = VoteNode::new(config)?;
    node.run().await?;

    Ok(())
}
