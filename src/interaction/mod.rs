//! Event handling and user interactions for lunch-bot.
//!
//! This module provides functionality for handling chat events:
//! - Recognizing keyword commands in channel text
//! - Filtering and dispatching messages addressed to the bot
//! - Welcoming the channel on the first ever run

pub mod command;
pub mod first_run;
pub mod message;
