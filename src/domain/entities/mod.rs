//! Domain entities - Core business objects with no external dependencies

pub mod participant;
pub mod message;

pub use participant::Participant;
pub use message::{Message, MessageKind, UnknownKind};
