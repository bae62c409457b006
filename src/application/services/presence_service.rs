use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::errors::ChatError;
use crate::domain::entities::Participant;
use crate::domain::traits::{Clock, ParticipantStore};

/// Owns the set of active participants and their liveness.
///
/// Every mutation goes through one conditional store primitive, so two calls
/// for the same name are serialised by the store and never interleave:
/// - `admit` is insert-if-absent, so duplicates lose without side effects.
/// - `heartbeat` only moves `last_seen_at` forward.
/// - `evict_if_stale` re-checks staleness at delete time, so a heartbeat that
///   lands after the sweep snapshot keeps the participant alive.
pub struct PresenceRegistry {
    store: Arc<dyn ParticipantStore>,
    clock: Arc<dyn Clock>,
}

impl PresenceRegistry {
    pub fn new(store: Arc<dyn ParticipantStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Inserts `{name, now}`. The join announcement is the caller's job.
    pub async fn admit(&self, name: &str) -> Result<Participant, ChatError> {
        if name.trim().is_empty() {
            return Err(ChatError::InvalidName(name.to_string()));
        }

        let participant = Participant::new(name, self.clock.now());
        if !self.store.insert_if_absent(&participant).await? {
            tracing::debug!("Registration refused, {} is taken", name);
            return Err(ChatError::AlreadyExists(name.to_string()));
        }

        tracing::info!("Participant registered: {}", name);
        Ok(participant)
    }

    /// Undoes an `admit` whose announcement could not be written.
    pub async fn withdraw(&self, name: &str) -> Result<bool, ChatError> {
        Ok(self.store.remove(name).await?)
    }

    pub async fn heartbeat(&self, name: &str) -> Result<(), ChatError> {
        let now = self.clock.now();
        if !self.store.touch(name, now).await? {
            return Err(ChatError::NotFound(name.to_string()));
        }
        tracing::debug!("Heartbeat from {} at {}", name, now);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Participant>, ChatError> {
        Ok(self.store.list().await?)
    }

    pub async fn lookup(&self, name: &str) -> Result<Option<Participant>, ChatError> {
        Ok(self.store.get(name).await?)
    }

    /// Removes `name` if it is still older than `cutoff`. `Ok(false)` means it
    /// was refreshed or already gone.
    pub async fn evict_if_stale(&self, name: &str, cutoff: DateTime<Utc>) -> Result<bool, ChatError> {
        Ok(self.store.remove_if_stale(name, cutoff).await?)
    }
}
