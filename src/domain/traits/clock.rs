use chrono::{DateTime, Utc};

/// Wall time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
