//! Read scoping: which log entries a viewer may see

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Message, MessageKind};

/// Strict rule. Anything not marked private is room-wide, private lines
/// are scoped to their two parties.
pub fn is_visible(message: &Message, viewer: &str) -> bool {
    match message.kind {
        MessageKind::Broadcast | MessageKind::Status => true,
        MessageKind::Private => message.from == viewer || message.to == viewer,
    }
}

/// How private messages addressed to the room sentinel are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityPolicy {
    /// Only the strict rule applies.
    #[default]
    Strict,
    /// Also shows any message addressed to the sentinel to every viewer.
    Legacy,
}

impl VisibilityPolicy {
    pub fn allows(&self, message: &Message, viewer: &str, everyone: &str) -> bool {
        match self {
            VisibilityPolicy::Strict => is_visible(message, viewer),
            VisibilityPolicy::Legacy => is_visible(message, viewer) || message.to == everyone,
        }
    }
}

/// Keeps the visible subset of `messages`, then the last `limit` of those in
/// chronological order. `None` or zero means no truncation.
pub fn select_visible<'a, I>(
    messages: I,
    viewer: &str,
    limit: Option<usize>,
    policy: VisibilityPolicy,
    everyone: &str,
) -> Vec<Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let visible: Vec<Message> = messages
        .into_iter()
        .filter(|m| policy.allows(m, viewer, everyone))
        .cloned()
        .collect();

    match limit {
        Some(n) if n > 0 && n < visible.len() => visible[visible.len() - n..].to_vec(),
        _ => visible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(from: &str, to: &str, kind: MessageKind) -> Message {
        Message::new(from, to, "oi", kind, Utc::now())
    }

    #[test]
    fn test_broadcast_and_status_visible_to_all() {
        assert!(is_visible(&msg("Ana", "Todos", MessageKind::Broadcast), "Bruno"));
        assert!(is_visible(&msg("Ana", "Todos", MessageKind::Status), "Carla"));
        // kind wins over address
        assert!(is_visible(&msg("Ana", "Bruno", MessageKind::Broadcast), "Carla"));
    }

    #[test]
    fn test_private_scoped_to_parties() {
        let m = msg("Ana", "Bruno", MessageKind::Private);
        assert!(is_visible(&m, "Ana"));
        assert!(is_visible(&m, "Bruno"));
        assert!(!is_visible(&m, "Carla"));
    }

    #[test]
    fn test_private_to_everyone_depends_on_policy() {
        let m = msg("Ana", "Todos", MessageKind::Private);
        assert!(!VisibilityPolicy::Strict.allows(&m, "Carla", "Todos"));
        assert!(VisibilityPolicy::Legacy.allows(&m, "Carla", "Todos"));
        assert!(VisibilityPolicy::Strict.allows(&m, "Ana", "Todos"));
    }

    #[test]
    fn test_limit_counts_visible_messages() {
        let log = vec![
            msg("Ana", "Todos", MessageKind::Broadcast),
            msg("Ana", "Bruno", MessageKind::Private),
            msg("Bruno", "Todos", MessageKind::Status),
            msg("Bruno", "Ana", MessageKind::Private),
        ];

        let got = select_visible(&log, "Carla", Some(2), VisibilityPolicy::Strict, "Todos");
        assert_eq!(got, vec![log[0].clone(), log[2].clone()]);

        let got = select_visible(&log, "Ana", Some(2), VisibilityPolicy::Strict, "Todos");
        assert_eq!(got, vec![log[2].clone(), log[3].clone()]);
    }

    #[test]
    fn test_no_truncation_for_none_or_zero() {
        let log = vec![
            msg("Ana", "Todos", MessageKind::Broadcast),
            msg("Bruno", "Todos", MessageKind::Broadcast),
        ];
        assert_eq!(select_visible(&log, "x", None, VisibilityPolicy::Strict, "Todos").len(), 2);
        assert_eq!(select_visible(&log, "x", Some(0), VisibilityPolicy::Strict, "Todos").len(), 2);
        assert_eq!(select_visible(&log, "x", Some(10), VisibilityPolicy::Strict, "Todos").len(), 2);
    }
}
