//! Handles channel messages addressed to the bot.

use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{messages, types::Void},
    interaction::command::Command,
    service::{
        chat::{ChatClient, ChatMessageEvent, EventStream},
        db::{DbClient, StoreError, StoreResult},
    },
};

/// Leading marker of public channel ids.
const CHANNEL_MARKER: char = 'C';

/// Drains `events` one message at a time until the sender side closes.
#[instrument(skip_all)]
pub async fn run_dispatcher(mut events: EventStream, db: DbClient, chat: ChatClient) {
    info!("Dispatcher started.");

    while let Some(event) = events.recv().await {
        // Process the event.
        let result = handle_message(event, &db, &chat).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling: {}", err);
        }
    }

    info!("Dispatcher stopped.");
}

/// Handles one inbound message: filters it, classifies it, runs the command and replies.
///
/// Store failures are logged and produce no reply. Only a failure to post the
/// reply is returned.
#[instrument(skip_all)]
pub async fn handle_message(event: ChatMessageEvent, db: &DbClient, chat: &ChatClient) -> Void {
    if !is_addressed_to_bot(&event, chat.bot_user_id(), chat.bot_name()) {
        return Ok(());
    }

    let (Some(text), Some(channel)) = (event.text.as_deref(), event.channel.as_deref()) else {
        return Ok(());
    };

    let Some(command) = Command::parse(text) else {
        debug!("Mentioned without a command.");
        return Ok(());
    };

    info!("Handling `{}` in `{}` ...", command.keyword(), channel);

    let reply = match execute(&command, db).await {
        Ok(reply) => reply,
        Err(StoreError::InvalidInput(reason)) => {
            warn!("Rejected `{}`: {}", command.keyword(), reason);
            messages::missing_name(command.keyword())
        }
        Err(StoreError::EmptyStore) => messages::NOTHING_TO_RECOMMEND.to_string(),
        Err(err) => {
            error!("Store failure while handling `{}`: {}", command.keyword(), err);
            return Ok(());
        }
    };

    chat.send_message(channel, &reply).await
}

/// Whether the event is a channel message from someone else that mentions the bot.
pub fn is_addressed_to_bot(event: &ChatMessageEvent, bot_user_id: &str, bot_name: &str) -> bool {
    let Some(text) = event.text.as_deref().filter(|text| !text.is_empty()) else {
        return false;
    };

    if event.event_type != "message" {
        return false;
    }

    if !event.channel.as_deref().is_some_and(|channel| channel.starts_with(CHANNEL_MARKER)) {
        return false;
    }

    if event.user.as_deref() == Some(bot_user_id) {
        return false;
    }

    let mentions_name = text.to_lowercase().contains(&bot_name.to_lowercase());
    let mentions_user = text.contains(&format!("<@{bot_user_id}>"));

    mentions_name || mentions_user
}

/// Runs the command against the store and builds the reply.
async fn execute(command: &Command, db: &DbClient) -> StoreResult<String> {
    match command {
        Command::Add(name) => {
            db.add_spot(name).await?;
            Ok(messages::added(name))
        }
        Command::Remove(name) => {
            let removed = db.remove_spots_matching(name).await?;
            if removed == 0 { Ok(messages::not_found(name)) } else { Ok(messages::removed(name)) }
        }
        Command::Help => Ok(messages::HELP.to_string()),
        Command::ViewAll => {
            let names = db.list_all_sorted().await?;
            if names.is_empty() {
                Ok(messages::NOTHING_TO_VIEW.to_string())
            } else {
                Ok(messages::spot_list(&names))
            }
        }
        Command::Recommend => {
            let spot = db.pick_random().await?;

            // The spot may be removed in between; the reply still stands.
            if let Err(err) = db.increment_usage(&spot.id).await {
                warn!("Failed to count recommendation of `{}`: {}", spot.name, err);
            }

            Ok(messages::recommendation(&spot.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_ID: &str = "UBOT";
    const BOT_NAME: &str = "lunchbot";

    fn addressed(event: &ChatMessageEvent) -> bool {
        is_addressed_to_bot(event, BOT_ID, BOT_NAME)
    }

    #[test]
    fn accepts_channel_mention_by_name() {
        assert!(addressed(&ChatMessageEvent::message("C123", "U1", "@LunchBot help")));
    }

    #[test]
    fn accepts_mention_token() {
        assert!(addressed(&ChatMessageEvent::message("C123", "U1", "<@UBOT> help")));
    }

    #[test]
    fn rejects_non_message_events() {
        let mut event = ChatMessageEvent::message("C123", "U1", "lunchbot help");
        event.event_type = "message:MessageChanged".into();
        assert!(!addressed(&event));
    }

    #[test]
    fn rejects_empty_text() {
        assert!(!addressed(&ChatMessageEvent::message("C123", "U1", "")));
        assert!(!addressed(&ChatMessageEvent { text: None, ..ChatMessageEvent::message("C123", "U1", "") }));
    }

    #[test]
    fn rejects_direct_messages() {
        assert!(!addressed(&ChatMessageEvent::message("D123", "U1", "lunchbot help")));
        assert!(!addressed(&ChatMessageEvent { channel: None, ..ChatMessageEvent::message("C1", "U1", "lunchbot help") }));
    }

    #[test]
    fn rejects_own_messages() {
        assert!(!addressed(&ChatMessageEvent::message("C123", BOT_ID, "lunchbot add: Tacos")));
    }

    #[test]
    fn rejects_messages_without_mention() {
        assert!(!addressed(&ChatMessageEvent::message("C123", "U1", "add: Tacos")));
    }
}
