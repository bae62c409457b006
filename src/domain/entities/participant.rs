use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered member of the room. The name is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub last_seen_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(name: impl Into<String>, last_seen_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            last_seen_at,
        }
    }

    /// Stale means strictly older than `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_seen_at < cutoff
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stale_is_strict() {
        let now = Utc::now();
        let p = Participant::new("Ana", now);

        assert!(!p.is_stale(now));
        assert!(p.is_stale(now + Duration::milliseconds(1)));
        assert!(!p.is_stale(now - Duration::seconds(1)));
    }
}
