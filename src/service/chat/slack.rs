//! Slack integration for lunch-bot.
//!
//! This module connects to Slack over socket mode:
//! - Resolving the bot's own user from the workspace user list
//! - Forwarding channel messages to the dispatcher
//! - Posting replies and listing channels

use crate::base::{
    config::Config,
    types::{Res, Void},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::sync::Arc;

use super::{ChatChannel, ChatClient, ChatMessageEvent, ChatUser, EventSink, GenericChatClient, resolve_bot_user};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    events: EventSink,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    bot_name: String,
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Resolve the bot's own user by name.

        let users = fetch_users(&client, &bot_token).await?;
        let bot_user = resolve_bot_user(&users, &config.name)?;

        info!("Slack bot user `{}` has ID `{}`.", bot_user.name, bot_user.id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id: bot_user.id,
            bot_name: bot_user.name,
            client,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    fn bot_name(&self) -> &str {
        &self.bot_name
    }

    async fn start(&self, events: EventSink) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { events }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        info!("Slack listener stopped.");

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message)
            .with_as_user(true)
            .with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_channels(&self) -> Res<Vec<ChatChannel>> {
        let session = self.client.open_session(&self.bot_token);

        let mut channels = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;

        loop {
            let mut request = SlackApiConversationsListRequest::new();
            request.exclude_archived = Some(true);
            request.cursor = cursor.take();

            let response = session.conversations_list(&request).await?;

            channels.extend(response.channels.into_iter().map(|channel| ChatChannel {
                id: channel.id.0,
                name: channel.name.unwrap_or_default(),
                is_member: channel.flags.is_member.unwrap_or(false),
            }));

            match next_cursor(response.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(channels)
    }
}

// Helpers.

/// Pulls every user of the workspace, following pagination cursors.
async fn fetch_users(client: &FullClient, token: &SlackApiToken) -> Res<Vec<ChatUser>> {
    let session = client.open_session(token);

    let mut users = Vec::new();
    let mut cursor: Option<SlackCursorId> = None;

    loop {
        let mut request = SlackApiUsersListRequest::new();
        request.cursor = cursor.take();

        let response = session.users_list(&request).await?;

        users.extend(response.members.into_iter().filter_map(|member| member.name.map(|name| ChatUser { id: member.id.0, name })));

        match next_cursor(response.response_metadata) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!("Fetched {} users.", users.len());

    Ok(users)
}

/// Slack signals the last page with a missing or empty cursor.
fn next_cursor(metadata: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    metadata.and_then(|m| m.next_cursor).filter(|cursor| !cursor.0.is_empty())
}

/// Converts a Slack message event into the dispatcher's event shape.
fn to_chat_event(event: &SlackMessageEvent) -> ChatMessageEvent {
    let event_type = match &event.subtype {
        None => "message".to_string(),
        Some(subtype) => format!("message:{subtype:?}"),
    };

    ChatMessageEvent {
        event_type,
        text: event.content.as_ref().and_then(|c| c.text.clone()),
        channel: event.origin.channel.as_ref().map(|c| c.0.clone()),
        user: event.sender.user.as_ref().map(|u| u.0.clone()),
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            debug!("Received message event ...");

            user_state
                .events
                .send(to_chat_event(&slack_message_event))
                .map_err(|_| anyhow::anyhow!("Dispatcher is no longer receiving events"))?;
        }
        SlackEventCallbackBody::AppMention(_) => {
            // Mentions in channels also arrive as plain message events; handling both would reply twice.
            debug!("Skipping app mention event in favor of the message event.");
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}
