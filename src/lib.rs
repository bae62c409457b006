//! Presence-tracking chat room engine
//!
//! Participants register a name, keep it alive with heartbeats and are
//! expired by a background sweeper. Messages go to an append-only log and
//! are filtered per viewer on read.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::errors::{ChatError, StorageError};
pub use application::services::{ChatRoom, MessageLog, PresenceRegistry};
pub use application::sweeper::{ExpirySweeper, SweepReport, SweeperHandle};
pub use domain::entities::{Message, MessageKind, Participant};
pub use domain::visibility::{is_visible, VisibilityPolicy};
