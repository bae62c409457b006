use std::sync::Arc;

use crate::application::errors::ChatError;
use crate::application::services::message_service::{AnnounceRetry, MessageLog};
use crate::application::services::presence_service::PresenceRegistry;
use crate::application::sweeper::ExpirySweeper;
use crate::domain::entities::{Message, MessageKind, Participant};
use crate::domain::traits::{Clock, MessageStore, ParticipantStore};
use crate::infrastructure::config::Config;

/// Entry point used by request surfaces. Couples the registry and the log.
#[derive(Clone)]
pub struct ChatRoom {
    registry: Arc<PresenceRegistry>,
    log: Arc<MessageLog>,
    sweeper: Arc<ExpirySweeper>,
    join_text: String,
}

impl ChatRoom {
    pub fn from_config(
        config: &Config,
        participants: Arc<dyn ParticipantStore>,
        messages: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let retry = AnnounceRetry {
            attempts: config.delivery.announce_attempts,
            backoff: config.retry_backoff(),
        };
        let log = MessageLog::new(messages, config.room.everyone.clone())
            .with_policy(config.visibility_policy())
            .with_retry(retry);

        let registry = Arc::new(PresenceRegistry::new(participants, clock));
        let log = Arc::new(log);
        let sweeper = Arc::new(ExpirySweeper::new(
            registry.clone(),
            log.clone(),
            config.stale_threshold(),
            config.room.leave_text.clone(),
        ));

        Self {
            registry,
            log,
            sweeper,
            join_text: config.room.join_text.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    pub fn log(&self) -> &Arc<MessageLog> {
        &self.log
    }

    /// The room's one sweeper. Every handle shares its overlap guard and its
    /// queue of unrecorded departures.
    pub fn sweeper(&self) -> Arc<ExpirySweeper> {
        self.sweeper.clone()
    }

    /// Registers `name` and announces the join. If the announcement cannot
    /// be written, the registration is rolled back.
    ///
    /// The registry entry exists while the join is being retried, so the
    /// new participant may already post and heartbeat; such messages can
    /// precede the join line. A join write that landed with its
    /// acknowledgement lost is detected by `MessageLog::announce` and kept.
    /// Only when the log cannot be read back either can a rollback leave a
    /// join line for a registration that no longer exists; that case is
    /// logged for reconciliation.
    pub async fn register(&self, name: &str) -> Result<(), ChatError> {
        let participant = self.registry.admit(name).await?;
        let joined = Message::status(
            &participant.name,
            self.log.everyone(),
            &self.join_text,
            participant.last_seen_at,
        );

        if let Err(e) = self.log.announce(&joined).await {
            tracing::error!("Join announcement for {} not confirmed, rolling back registration; any stray join line needs reconciliation: {}", name, e);
            if let Err(undo) = self.registry.withdraw(name).await {
                tracing::error!("Rollback of {} failed, registry needs reconciliation: {}", name, undo);
            }
            return Err(e);
        }

        Ok(())
    }

    pub async fn heartbeat(&self, name: &str) -> Result<(), ChatError> {
        self.registry.heartbeat(name).await
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>, ChatError> {
        self.registry.list().await
    }

    /// Appends a client message. An unregistered sender, or an unregistered
    /// addressee of a private message, is `UnknownSender`.
    pub async fn post_message(&self, from: &str, to: &str, text: &str, kind: MessageKind) -> Result<(), ChatError> {
        if kind == MessageKind::Status {
            return Err(ChatError::InvalidMessage("status messages are reserved".to_string()));
        }

        let message = Message::new(from, to, text, kind, self.registry.now());
        message
            .check_invariants(self.log.everyone())
            .map_err(ChatError::InvalidMessage)?;

        if self.registry.lookup(from).await?.is_none() {
            tracing::debug!("Rejected post from unregistered {}", from);
            return Err(ChatError::UnknownSender(from.to_string()));
        }

        if kind == MessageKind::Private
            && to != self.log.everyone()
            && self.registry.lookup(to).await?.is_none()
        {
            tracing::debug!("Rejected private message from {} to unregistered {}", from, to);
            return Err(ChatError::UnknownSender(to.to_string()));
        }

        self.log.append(&message).await?;
        tracing::info!("{} -> {} ({})", from, to, kind);
        Ok(())
    }

    pub async fn get_messages(&self, viewer: &str, limit: Option<usize>) -> Result<Vec<Message>, ChatError> {
        self.log.read_visible(viewer, limit).await
    }
}
