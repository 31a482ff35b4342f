//! Core components, types, and utilities for the lunch-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Canned replies the bot posts back to the channel.
//! - Common types and result handling.

pub mod config;
pub mod messages;
pub mod types;
