//! Leavedesk Core - Leave domain types and validation rules.
//!
//! This crate provides the types shared by all Leavedesk components:
//! - `server` - Slack webhooks, leave ingestion and the HTTP API
//! - `cli` - Command-line tools for migrations and webhook signing
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no
//! database access, no HTTP clients. Anything that needs a store (such as
//! overlap detection) lives in the server crate and builds on the
//! [`DateRange::overlaps`] rule defined here.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, leave records, date ranges and source references
//! - [`validation`] - Structural invariants a leave must satisfy before it is stored
//! - [`error`] - Domain errors surfaced to end users

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod types;
pub mod validation;

pub use error::DomainError;
pub use types::*;
pub use validation::validate_for_persistence;
