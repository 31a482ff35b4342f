//! Library root for `lunch-bot`.
//!
//! Lunch-bot sits in Slack channels and keeps a shared list of lunch spots:
//! - Add and remove spots with `add: <name>` / `remove: <name>`
//! - Show the whole list with `view-all`
//! - Pick a spot at random with `recommendation`
//!
//! The bot integrates with Slack for chat and SurrealDB for storage. Both sit
//! behind traits so that either can be swapped out, or mocked in tests.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the lunch-bot runtime:
/// - Initializes the crypto provider
/// - Opens the spot store and connects to Slack
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting lunch-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the default crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
