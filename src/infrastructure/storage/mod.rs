//! In-memory storage implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{Message, Participant};
use crate::domain::traits::{MessageStore, ParticipantStore};

/// Process-local store. Each map sits behind its own lock, so the registry
/// and the log never contend with each other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    participants: Arc<RwLock<BTreeMap<String, Participant>>>,
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn insert_if_absent(&self, participant: &Participant) -> Result<bool, StorageError> {
        let mut participants = self.participants.write().await;
        if participants.contains_key(&participant.name) {
            return Ok(false);
        }
        participants.insert(participant.name.clone(), participant.clone());
        Ok(true)
    }

    async fn get(&self, name: &str) -> Result<Option<Participant>, StorageError> {
        let participants = self.participants.read().await;
        Ok(participants.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Participant>, StorageError> {
        let participants = self.participants.read().await;
        Ok(participants.values().cloned().collect())
    }

    async fn touch(&self, name: &str, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut participants = self.participants.write().await;
        match participants.get_mut(name) {
            Some(p) => {
                if at > p.last_seen_at {
                    p.last_seen_at = at;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_if_stale(&self, name: &str, cutoff: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut participants = self.participants.write().await;
        let stale = participants
            .get(name)
            .map(|p| p.is_stale(cutoff))
            .unwrap_or(false);
        if stale {
            participants.remove(name);
        }
        Ok(stale)
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let mut participants = self.participants.write().await;
        Ok(participants.remove(name).is_some())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: &Message) -> Result<(), StorageError> {
        let mut messages = self.messages.write().await;
        messages.push(message.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Message>, StorageError> {
        let messages = self.messages.read().await;
        Ok(messages.clone())
    }
}
