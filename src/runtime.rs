//! Runtime services and shared state for the lunch-bot.

use tracing::{error, info, instrument};

use crate::base::config::Config;
use crate::{
    base::types::{Res, Void},
    interaction::{first_run, message},
    service::{
        chat::{self, ChatClient},
        db::DbClient,
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the database client, chat client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The spot store.
    pub db: DbClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    ///
    /// Fails if the store cannot be opened or the bot user cannot be found.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::surreal(&config.db_path).await?;

        // Initialize the chat client.
        let chat = ChatClient::slack(&config).await?;

        Ok(Self { config, db, chat })
    }

    /// Runs the first-run check, then handles messages until the chat listener stops.
    pub async fn start(&self) -> Void {
        if let Err(err) = first_run::check_first_run(&self.config, &self.db, &self.chat).await {
            error!("Failed to check the last run: {}", err);
        }

        let (events, stream) = chat::event_channel();
        let dispatcher = tokio::spawn(message::run_dispatcher(stream, self.db.clone(), self.chat.clone()));

        let result = self.chat.start(events).await;

        // The listener owned the only sender, so the dispatcher drains what is left and exits.
        dispatcher.await?;

        info!("Runtime stopped.");

        result
    }
}
