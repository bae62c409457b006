use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::{ChatError, StorageError};
use crate::domain::entities::Message;
use crate::domain::traits::MessageStore;
use crate::domain::visibility::{select_visible, VisibilityPolicy};

/// At-least-once policy for engine-generated announcements
#[derive(Debug, Clone, Copy)]
pub struct AnnounceRetry {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for AnnounceRetry {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// The ordered, append-only room log
pub struct MessageLog {
    store: Arc<dyn MessageStore>,
    everyone: String,
    policy: VisibilityPolicy,
    retry: AnnounceRetry,
}

impl MessageLog {
    pub fn new(store: Arc<dyn MessageStore>, everyone: impl Into<String>) -> Self {
        Self {
            store,
            everyone: everyone.into(),
            policy: VisibilityPolicy::default(),
            retry: AnnounceRetry::default(),
        }
    }

    pub fn with_policy(mut self, policy: VisibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: AnnounceRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Sentinel recipient meaning the whole room
    pub fn everyone(&self) -> &str {
        &self.everyone
    }

    pub async fn append(&self, message: &Message) -> Result<(), ChatError> {
        message
            .check_invariants(&self.everyone)
            .map_err(ChatError::InvalidMessage)?;

        self.store.append(message).await?;
        tracing::debug!("Appended {} from {} to {}", message.kind, message.from, message.to);
        Ok(())
    }

    /// Appends with retries. After a failed attempt the log is read back, and
    /// a write whose acknowledgement was lost counts as delivered. If that
    /// read also fails, a retry may duplicate the line: a duplicate is
    /// preferred over a missing one.
    pub async fn announce(&self, message: &Message) -> Result<(), ChatError> {
        message
            .check_invariants(&self.everyone)
            .map_err(ChatError::InvalidMessage)?;

        let attempts = self.retry.attempts.max(1);
        let mut last_err: Option<StorageError> = None;

        for attempt in 1..=attempts {
            match self.store.append(message).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!("Announcement '{}' for {} written on attempt {}", message.text, message.from, attempt);
                    }
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        "Announcement '{}' for {} failed (attempt {}/{}): {}",
                        message.text,
                        message.from,
                        attempt,
                        attempts,
                        e
                    );
                    if self.landed(message).await {
                        tracing::info!("Announcement '{}' for {} was written despite the error", message.text, message.from);
                        return Ok(());
                    }
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                }
            }
        }

        let err = last_err.unwrap_or_else(|| StorageError::Unavailable("no attempt made".to_string()));
        Err(ChatError::StorageUnavailable(err))
    }

    async fn landed(&self, message: &Message) -> bool {
        match self.store.read_all().await {
            Ok(all) => all.iter().rev().any(|m| same_entry(m, message)),
            Err(_) => false,
        }
    }

    pub async fn read_all(&self) -> Result<Vec<Message>, ChatError> {
        Ok(self.store.read_all().await?)
    }

    /// Messages `viewer` may read, optionally only the last `limit` of them.
    pub async fn read_visible(&self, viewer: &str, limit: Option<usize>) -> Result<Vec<Message>, ChatError> {
        let all = self.store.read_all().await?;
        Ok(select_visible(&all, viewer, limit, self.policy, &self.everyone))
    }
}

// Stores may keep timestamps at millisecond precision.
fn same_entry(a: &Message, b: &Message) -> bool {
    a.kind == b.kind
        && a.from == b.from
        && a.to == b.to
        && a.text == b.text
        && a.sent_at.timestamp_millis() == b.sent_at.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::MessageKind;
    use crate::infrastructure::storage::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_append_rechecks_invariants() {
        let store = Arc::new(MemoryStore::new());
        let log = MessageLog::new(store.clone(), "Todos");

        let empty = Message::new("Ana", "Todos", "", MessageKind::Broadcast, Utc::now());
        assert!(matches!(log.append(&empty).await, Err(ChatError::InvalidMessage(_))));

        let misrouted = Message::new("Ana", "Bruno", "joined", MessageKind::Status, Utc::now());
        assert!(matches!(log.announce(&misrouted).await, Err(ChatError::InvalidMessage(_))));

        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_visible_applies_policy_then_limit() {
        let store = Arc::new(MemoryStore::new());
        let log = MessageLog::new(store, "Todos");
        let now = Utc::now();

        log.append(&Message::new("Ana", "Todos", "hi all", MessageKind::Broadcast, now)).await.unwrap();
        log.append(&Message::new("Ana", "Bruno", "oi", MessageKind::Private, now)).await.unwrap();
        log.append(&Message::new("Ana", "Todos", "psst", MessageKind::Private, now)).await.unwrap();

        let carla = log.read_visible("Carla", None).await.unwrap();
        assert_eq!(carla.len(), 1);
        assert_eq!(carla[0].text, "hi all");

        let bruno = log.read_visible("Bruno", Some(1)).await.unwrap();
        assert_eq!(bruno.len(), 1);
        assert_eq!(bruno[0].text, "oi");
    }

    #[tokio::test]
    async fn test_legacy_policy_shows_private_to_everyone() {
        let store = Arc::new(MemoryStore::new());
        let log = MessageLog::new(store, "Todos").with_policy(VisibilityPolicy::Legacy);

        log.append(&Message::new("Ana", "Todos", "psst", MessageKind::Private, Utc::now()))
            .await
            .unwrap();
        assert_eq!(log.read_visible("Carla", None).await.unwrap().len(), 1);
    }

    /// Writes every message, then reports failure for the first `lost` of them
    struct LostAckStore {
        inner: MemoryStore,
        lost: std::sync::atomic::AtomicU32,
    }

    #[async_trait::async_trait]
    impl MessageStore for LostAckStore {
        async fn append(&self, message: &Message) -> Result<(), StorageError> {
            self.inner.append(message).await?;
            let left = self.lost.load(std::sync::atomic::Ordering::SeqCst);
            if left > 0 {
                self.lost.store(left - 1, std::sync::atomic::Ordering::SeqCst);
                return Err(StorageError::Unavailable("ack lost".to_string()));
            }
            Ok(())
        }

        async fn read_all(&self) -> Result<Vec<Message>, StorageError> {
            self.inner.read_all().await
        }
    }

    #[tokio::test]
    async fn test_announce_counts_write_with_lost_ack_as_delivered() {
        let store = Arc::new(LostAckStore {
            inner: MemoryStore::new(),
            lost: std::sync::atomic::AtomicU32::new(1),
        });
        let log = MessageLog::new(store, "Todos").with_retry(AnnounceRetry {
            attempts: 3,
            backoff: Duration::ZERO,
        });

        let joined = Message::status("Ana", "Todos", "joined", Utc::now());
        log.announce(&joined).await.unwrap();

        // written once, not once per attempt
        assert_eq!(log.read_all().await.unwrap().len(), 1);
    }
}
