//! Chat session controller and terminal front end.
//!
//! This module provides the client half of the message exchange:
//!
//! - A turn-taking session that keeps at most one message in flight
//! - An append-only transcript with optimistic user entries
//! - Input affordances (send key, line-break modifier, send button)
//! - Slash commands for the terminal client
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and gateway interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_GREETING};
pub use session::{
    APOLOGY, ChatSession, IgnoreReason, InputEvent, Key, SessionStats, SubmitOutcome, TurnState,
};
