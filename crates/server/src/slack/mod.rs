//! Slack integration for leave requests.
//!
//! This module provides:
//! - [`SignatureVerifier`] for authenticating inbound webhooks
//! - Payload decoding for slash commands and interactive callbacks
//! - [`InteractionMetadata`], the correlation state carried by the modal
//! - [`SlackClient`] for posting messages and opening modals
//! - Block Kit types and message builders
//!
//! # Flow
//!
//! 1. A user runs `/leave`; the command webhook is verified and decoded
//! 2. An anchor message is posted to the channel, mentioning the user
//! 3. The leave form is opened with the channel and thread in its metadata
//! 4. On submission the metadata is decoded and the leave is ingested
//! 5. The outcome is posted as a reply in the anchor's thread

mod client;
mod error;
pub mod messages;
mod metadata;
pub mod modal;
pub mod payload;
mod signature;
mod types;

pub use client::{SlackApi, SlackClient};
pub use error::{MetadataError, PayloadError, SignatureError, SlackError};
pub use metadata::{
    InteractionMetadata, extract_channel_id, extract_channel_name, extract_thread_ts,
    extract_user_id,
};
pub use payload::{
    InteractionEvent, SlashCommand, ViewClosed, ViewSubmission, decode_interaction,
    decode_slash_command,
};
pub use signature::{DEFAULT_TOLERANCE, SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER};
pub use types::{Block, ContextElement, InputElement, OptionObject, PlainText, Text, View};
