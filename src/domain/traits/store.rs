use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::application::errors::StorageError;
use crate::domain::entities::{Message, Participant};

/// Participant persistence. Every method is atomic with respect to the others
/// for the same name; the registry relies on this for its race guarantees.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Inserts unless the name is taken. Returns `false` when it was.
    async fn insert_if_absent(&self, participant: &Participant) -> Result<bool, StorageError>;

    async fn get(&self, name: &str) -> Result<Option<Participant>, StorageError>;

    /// Snapshot ordered by name.
    async fn list(&self) -> Result<Vec<Participant>, StorageError>;

    /// Moves `last_seen_at` forward to `at`, never backward. Returns `false`
    /// when no such participant exists.
    async fn touch(&self, name: &str, at: DateTime<Utc>) -> Result<bool, StorageError>;

    /// Deletes the participant only if its current `last_seen_at` is strictly
    /// older than `cutoff`. Returns whether a row was removed.
    async fn remove_if_stale(&self, name: &str, cutoff: DateTime<Utc>) -> Result<bool, StorageError>;

    /// Unconditional delete, used to undo a registration.
    async fn remove(&self, name: &str) -> Result<bool, StorageError>;
}

/// Append-only message persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: &Message) -> Result<(), StorageError>;

    /// Every message in insertion order.
    async fn read_all(&self) -> Result<Vec<Message>, StorageError>;
}
