use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a room message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[serde(rename = "message")]
    Broadcast,
    #[serde(rename = "private_message")]
    Private,
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Broadcast => "message",
            MessageKind::Private => "private_message",
            MessageKind::Status => "status",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a wire string names no known kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(MessageKind::Broadcast),
            "private_message" => Ok(MessageKind::Private),
            "status" => Ok(MessageKind::Status),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// An entry of the room log. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
        kind: MessageKind,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            text: text.into(),
            kind,
            sent_at,
        }
    }

    /// Room-wide status line, e.g. a join or leave announcement
    pub fn status(
        from: impl Into<String>,
        everyone: impl Into<String>,
        text: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self::new(from, everyone, text, MessageKind::Status, sent_at)
    }

    pub fn is_private(&self) -> bool {
        self.kind == MessageKind::Private
    }

    /// Checks the structural invariants every stored message must hold.
    pub fn check_invariants(&self, everyone: &str) -> Result<(), String> {
        if self.from.trim().is_empty() {
            return Err("sender must not be empty".to_string());
        }
        if self.to.trim().is_empty() {
            return Err("recipient must not be empty".to_string());
        }
        if self.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        if self.kind == MessageKind::Status && self.to != everyone {
            return Err(format!("status messages must target '{}'", everyone));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!("message".parse::<MessageKind>(), Ok(MessageKind::Broadcast));
        assert_eq!("private_message".parse::<MessageKind>(), Ok(MessageKind::Private));
        assert_eq!("status".parse::<MessageKind>(), Ok(MessageKind::Status));
        assert!("shout".parse::<MessageKind>().is_err());

        let json = serde_json::to_string(&MessageKind::Private).unwrap();
        assert_eq!(json, "\"private_message\"");
    }

    #[test]
    fn test_invariants() {
        let now = Utc::now();
        assert!(Message::new("Ana", "Todos", "oi", MessageKind::Broadcast, now)
            .check_invariants("Todos")
            .is_ok());
        assert!(Message::new("", "Todos", "oi", MessageKind::Broadcast, now)
            .check_invariants("Todos")
            .is_err());
        assert!(Message::new("Ana", "Todos", "   ", MessageKind::Broadcast, now)
            .check_invariants("Todos")
            .is_err());
        assert!(Message::new("Ana", "Bruno", "joined", MessageKind::Status, now)
            .check_invariants("Todos")
            .is_err());
        assert!(Message::status("Ana", "Todos", "joined", now)
            .check_invariants("Todos")
            .is_ok());
    }
}
