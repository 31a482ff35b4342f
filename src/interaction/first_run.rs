//! Startup bookkeeping: welcome the channel on the very first run and record every run.

use chrono::{SecondsFormat, Utc};
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        messages,
        types::{Res, Void},
    },
    service::{
        chat::{ChatChannel, ChatClient},
        db::DbClient,
    },
};

/// Posts the welcome if no run was ever recorded, then records this run.
///
/// Returns whether this was the first run.
#[instrument(skip_all)]
pub async fn check_first_run(config: &Config, db: &DbClient, chat: &ChatClient) -> Res<bool> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let first_run = match db.get_last_run().await? {
        Some(last_run) => {
            info!("Last run was at {}.", last_run);
            false
        }
        None => {
            info!("First run, saying hello ...");

            if let Err(err) = welcome(config, chat).await {
                warn!("Failed to post the welcome message: {}", err);
            }

            true
        }
    };

    db.record_run(&now).await?;

    Ok(first_run)
}

async fn welcome(config: &Config, chat: &ChatClient) -> Void {
    let channels = chat.list_channels().await?;

    let Some(channel) = pick_welcome_channel(&channels, config.welcome_channel.as_deref()) else {
        warn!("No channel to post the welcome message to.");
        return Ok(());
    };

    chat.send_message(&channel.id, &messages::welcome(chat.bot_name())).await?;
    chat.send_message(&channel.id, messages::WELCOME_PUN).await?;

    Ok(())
}

/// The configured channel by name, else the first channel the bot has joined.
fn pick_welcome_channel<'a>(channels: &'a [ChatChannel], preferred: Option<&str>) -> Option<&'a ChatChannel> {
    match preferred {
        Some(name) => channels.iter().find(|c| c.name == name.trim_start_matches('#')),
        None => channels.iter().find(|c| c.is_member),
    }
}
