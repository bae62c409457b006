//! SQLite-backed participant registry and message log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::application::errors::StorageError;
use crate::domain::entities::{Message, MessageKind, Participant, UnknownKind};
use crate::domain::traits::{MessageStore, ParticipantStore};

/// Single-connection store. Statements run under one mutex, which gives the
/// read-your-writes consistency the core expects.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn init_tables(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS participants (
            name TEXT PRIMARY KEY NOT NULL,
            last_seen_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_name TEXT NOT NULL,
            to_name TEXT NOT NULL,
            text TEXT NOT NULL,
            kind TEXT NOT NULL,
            sent_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Serialization(format!("timestamp out of range: {}", ms)))
}

#[async_trait]
impl ParticipantStore for SqliteStore {
    async fn insert_if_absent(&self, participant: &Participant) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "INSERT OR IGNORE INTO participants (name, last_seen_at) VALUES (?1, ?2)",
            rusqlite::params![participant.name, to_millis(participant.last_seen_at)],
        )?;
        Ok(rows == 1)
    }

    async fn get(&self, name: &str) -> Result<Option<Participant>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, last_seen_at FROM participants WHERE name = ?1")?;
        let mut rows = stmt.query([name])?;

        if let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let ms: i64 = row.get(1)?;
            Ok(Some(Participant::new(name, from_millis(ms)?)))
        } else {
            Ok(None)
        }
    }

    async fn list(&self) -> Result<Vec<Participant>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, last_seen_at FROM participants ORDER BY name")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut participants = Vec::new();
        for row in rows {
            let (name, ms) = row?;
            participants.push(Participant::new(name, from_millis(ms)?));
        }
        Ok(participants)
    }

    async fn touch(&self, name: &str, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE participants SET last_seen_at = MAX(last_seen_at, ?1) WHERE name = ?2",
            rusqlite::params![to_millis(at), name],
        )?;
        Ok(rows > 0)
    }

    async fn remove_if_stale(&self, name: &str, cutoff: DateTime<Utc>) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM participants WHERE name = ?1 AND last_seen_at < ?2",
            rusqlite::params![name, to_millis(cutoff)],
        )?;
        Ok(rows > 0)
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM participants WHERE name = ?1", [name])?;
        Ok(rows > 0)
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, message: &Message) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (from_name, to_name, text, kind, sent_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                message.from,
                message.to,
                message.text,
                message.kind.as_str(),
                to_millis(message.sent_at)
            ],
        )?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Message>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT from_name, to_name, text, kind, sent_at FROM messages ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (from, to, text, kind, ms) = row?;
            let kind: MessageKind = kind
                .parse()
                .map_err(|e: UnknownKind| StorageError::Serialization(e.to_string()))?;
            messages.push(Message::new(from, to, text, kind, from_millis(ms)?));
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    #[tokio::test]
    async fn test_participant_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let start = at(1_700_000_000_000);

        assert!(store.insert_if_absent(&Participant::new("Ana", start)).await.unwrap());
        assert!(!store.insert_if_absent(&Participant::new("Ana", start)).await.unwrap());

        assert!(store.touch("Ana", start + Duration::seconds(5)).await.unwrap());
        assert!(store.touch("Ana", start).await.unwrap());
        let ana = store.get("Ana").await.unwrap().unwrap();
        assert_eq!(ana.last_seen_at, start + Duration::seconds(5));

        assert!(!store.remove_if_stale("Ana", start + Duration::seconds(5)).await.unwrap());
        assert!(store.remove_if_stale("Ana", start + Duration::seconds(6)).await.unwrap());
        assert!(store.get("Ana").await.unwrap().is_none());
        assert!(!store.touch("Ana", start).await.unwrap());
    }

    #[tokio::test]
    async fn test_messages_keep_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let t = at(1_700_000_000_000);

        store.append(&Message::status("Ana", "Todos", "joined", t)).await.unwrap();
        store
            .append(&Message::new("Ana", "Bruno", "oi", MessageKind::Private, t - Duration::seconds(1)))
            .await
            .unwrap();

        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, MessageKind::Status);
        assert_eq!(all[1].text, "oi");
        assert_eq!(all[1].sent_at, t - Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        let t = at(1_700_000_000_000);
        for name in ["Bruno", "Ana"] {
            store.insert_if_absent(&Participant::new(name, t)).await.unwrap();
        }
        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Ana", "Bruno"]);
    }
}
