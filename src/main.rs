//! Binary entry point for the helpdesk daemon.
//!
//! Runtime logic lives in `helpdesk::server`; this binary only installs the
//! log subscriber and delegates.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
    helpdesk::server::run().await
}
