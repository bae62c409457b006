//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Clock: System and manual time sources
//! - Storage: In-memory persistence
//! - Database: SQLite persistence
//! - Adapters: Request surfaces (console)

pub mod config;
pub mod clock;
pub mod storage;
pub mod database;
pub mod adapters;
