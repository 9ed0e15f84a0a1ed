//! Business logic services.
//!
//! # Services
//!
//! - `dispatcher` - Bounded pool running fire-and-forget background tasks
//! - `ingestion` - Validation, upsert and storage of leaves
//! - `interaction` - The Slack leave request conversation
//! - `notifier` - Best-effort thread replies
//! - `overlap` - Per-user date overlap detection
//! - `sync` - Outbound notification of stored leaves

pub mod dispatcher;
pub mod ingestion;
pub mod interaction;
pub mod notifier;
pub mod overlap;
pub mod sync;

pub use dispatcher::TaskDispatcher;
pub use ingestion::{IngestionError, LeaveIngestRequest, LeaveIngestionService};
pub use interaction::{Acknowledgement, InteractionError, InteractionService, Resolution};
pub use notifier::{ConversationNotifier, ThreadTarget};
pub use overlap::validate_no_overlap;
pub use sync::{LeaveSync, LoggingSync, SyncError};
