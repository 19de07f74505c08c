//! Where archived messages go.
//!
//! [`MessageStore`] is the storage contract: chats and users are upserted,
//! messages are unique per `(chat_id, message_id)`. [`MemoryStore`] keeps
//! everything in process memory.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Mutex;

use crate::record::MessageRecord;

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Persistence for extracted records.
pub trait MessageStore: Send + Sync {
    fn upsert_chat(&self, chat_id: i64) -> io::Result<()>;

    fn upsert_user(&self, user_id: i64) -> io::Result<()>;

    fn exists_message(&self, chat_id: i64, message_id: i32) -> io::Result<bool>;

    fn insert_message(&self, record: &MessageRecord) -> io::Result<()>;

    /// Human-readable name of this store (for log messages).
    fn name(&self) -> &str;
}

/// Store `records`, skipping those already present.
///
/// Returns the records that were newly inserted, in input order.
pub fn archive(records: Vec<MessageRecord>, store: &dyn MessageStore) -> io::Result<Vec<MessageRecord>> {
    let mut inserted = Vec::new();
    for record in records {
        store.upsert_chat(record.chat_id)?;
        if let Some(user_id) = record.user_id {
            store.upsert_user(user_id)?;
        }
        if store.exists_message(record.chat_id, record.message_id)? {
            tracing::debug!("[archive] {}/{} already stored", record.chat_id, record.message_id);
            continue;
        }
        store.insert_message(&record)?;
        inserted.push(record);
    }
    Ok(inserted)
}

// ─── MemoryStore ──────────────────────────────────────────────────────────────

/// A store that keeps everything in memory and forgets it on exit.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    chats:    BTreeSet<i64>,
    users:    BTreeSet<i64>,
    messages: BTreeMap<(i64, i32), MessageRecord>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn tables(&self) -> io::Result<std::sync::MutexGuard<'_, Tables>> {
        self.inner.lock().map_err(|_| io::Error::other("memory store lock poisoned"))
    }

    /// All stored messages ordered by `(chat_id, message_id)`.
    pub fn messages(&self) -> io::Result<Vec<MessageRecord>> {
        Ok(self.tables()?.messages.values().cloned().collect())
    }

    pub fn has_chat(&self, chat_id: i64) -> io::Result<bool> {
        Ok(self.tables()?.chats.contains(&chat_id))
    }

    pub fn has_user(&self, user_id: i64) -> io::Result<bool> {
        Ok(self.tables()?.users.contains(&user_id))
    }
}

impl MessageStore for MemoryStore {
    fn upsert_chat(&self, chat_id: i64) -> io::Result<()> {
        self.tables()?.chats.insert(chat_id);
        Ok(())
    }

    fn upsert_user(&self, user_id: i64) -> io::Result<()> {
        self.tables()?.users.insert(user_id);
        Ok(())
    }

    fn exists_message(&self, chat_id: i64, message_id: i32) -> io::Result<bool> {
        Ok(self.tables()?.messages.contains_key(&(chat_id, message_id)))
    }

    fn insert_message(&self, record: &MessageRecord) -> io::Result<()> {
        self.tables()?.messages.insert(record.key(), record.clone());
        Ok(())
    }

    fn name(&self) -> &str { "in-memory" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Audit;
    use chrono::DateTime;

    fn record(chat_id: i64, message_id: i32, text: &str) -> MessageRecord {
        MessageRecord {
            chat_id,
            user_id: Some(5),
            message_id,
            reply_to: None,
            text: Some(text.into()),
            sent_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            audit: Audit::default(),
        }
    }

    #[test]
    fn duplicates_are_skipped() {
        let store = MemoryStore::new();
        let first = archive(vec![record(-100, 1, "a"), record(-100, 2, "b")], &store).unwrap();
        assert_eq!(first.len(), 2);

        let second = archive(vec![record(-100, 2, "changed"), record(-200, 2, "c")], &store).unwrap();
        assert_eq!(second, vec![record(-200, 2, "c")]);

        let stored = store.messages().unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.contains(&record(-100, 2, "b")));
        assert!(store.has_chat(-200).unwrap());
        assert!(store.has_user(5).unwrap());
    }
}
