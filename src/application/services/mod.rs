//! Application services - Business logic orchestration

pub mod presence_service;
pub mod message_service;
pub mod room_service;

pub use presence_service::PresenceRegistry;
pub use message_service::{AnnounceRetry, MessageLog};
pub use room_service::ChatRoom;
