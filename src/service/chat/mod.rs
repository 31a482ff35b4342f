pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::base::types::{Res, Void};

// Types.

/// Sink the chat client pushes inbound messages into.
///
/// A single dispatcher drains the other end, so messages are handled one at a time
/// in arrival order.
pub type EventSink = mpsc::UnboundedSender<ChatMessageEvent>;

/// Receiving end of an [`EventSink`].
pub type EventStream = mpsc::UnboundedReceiver<ChatMessageEvent>;

/// Platform-neutral inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatMessageEvent {
    /// Event type as reported by the platform (`"message"` for plain messages).
    pub event_type: String,
    pub text: Option<String>,
    /// Channel id the message was posted in.
    pub channel: Option<String>,
    /// Author's user id.
    pub user: Option<String>,
}

impl ChatMessageEvent {
    /// Builds a plain `"message"` event.
    pub fn message(channel: impl Into<String>, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            event_type: "message".to_string(),
            text: Some(text.into()),
            channel: Some(channel.into()),
            user: Some(user.into()),
        }
    }
}

/// A channel visible to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatChannel {
    pub id: String,
    pub name: String,
    /// Whether the bot has joined the channel.
    pub is_member: bool,
}

/// A user of the chat workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
}

/// Creates a channel for inbound messages.
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Finds the bot's own user by its configured name.
///
/// A missing user is an error, since every later mention and self-message check depends on it.
pub fn resolve_bot_user(users: &[ChatUser], name: &str) -> Res<ChatUser> {
    users
        .iter()
        .find(|user| user.name == name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No user named `{}` found in the workspace.", name))
}

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Slack. Implementing this trait allows different chat services to be used
/// with the lunch-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Used to drop the bot's own messages and to detect `<@id>` mentions.
    fn bot_user_id(&self) -> &str;

    /// Get the name the bot answers to.
    fn bot_name(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Inbound messages are pushed into `events` until the listener shuts down.
    async fn start(&self, events: EventSink) -> Void;

    /// Send a message to a channel.
    async fn send_message(&self, channel_id: &str, text: &str) -> Void;

    /// List the public channels of the workspace.
    async fn list_channels(&self) -> Res<Vec<ChatChannel>>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<ChatUser> {
        vec![
            ChatUser { id: "U1".into(), name: "alice".into() },
            ChatUser { id: "U2".into(), name: "lunchbot".into() },
        ]
    }

    #[test]
    fn resolves_bot_user_by_name() {
        let user = resolve_bot_user(&users(), "lunchbot").unwrap();
        assert_eq!(user.id, "U2");
    }

    #[test]
    fn missing_bot_user_is_an_error() {
        assert!(resolve_bot_user(&users(), "snackbot").is_err());
    }
}
