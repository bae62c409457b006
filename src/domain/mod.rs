//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (Participant, Message)
//! - Visibility: The read-scoping rule for the message log
//! - Traits: Abstractions for infrastructure (Clock, stores)

pub mod entities;
pub mod traits;
pub mod visibility;
