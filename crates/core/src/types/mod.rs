//! Core types for Leavedesk.
//!
//! This module provides type-safe wrappers for the leave domain.

pub mod date_range;
pub mod id;
pub mod leave;
pub mod source;

pub use date_range::DateRange;
pub use id::*;
pub use leave::{Leave, LeaveDuration, LeaveStatus, LeaveType, ParseEnumError};
pub use source::SourceRef;
