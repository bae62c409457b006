//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Presence registry, message log and the room facade
//! - Sweeper: Background expiry of silent participants
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing and dispatching for the console

pub mod errors;
pub mod services;
pub mod sweeper;
pub mod messaging;
