use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Offset between a channel id and its flat (negative) chat id.
pub const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// `-(channel_id + 10^12)`, the chat id clients use for a channel.
pub fn channel_to_chat_id(channel_id: i64) -> i64 {
    channel_id.wrapping_add(CHANNEL_ID_OFFSET).wrapping_neg()
}

/// Inverse of [`channel_to_chat_id`].
pub fn chat_to_channel_id(chat_id: i64) -> i64 {
    chat_id.wrapping_neg().wrapping_sub(CHANNEL_ID_OFFSET)
}

/// The key material and packet a record was decrypted from.
///
/// Shared between all records of one packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Audit {
    pub auth_key:   Arc<[u8]>,
    pub session_id: [u8; 8],
    pub packet:     Arc<[u8]>,
}

/// One archived channel message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub chat_id:    i64,
    pub user_id:    Option<i64>,
    pub message_id: i32,
    /// Only set for replies within the same chat.
    pub reply_to:   Option<i32>,
    /// Text with its formatting re-inserted; `None` for messages without text.
    pub text:       Option<String>,
    pub sent_at:    DateTime<Utc>,
    pub audit:      Audit,
}

impl MessageRecord {
    /// Storage key: messages are unique per chat.
    pub fn key(&self) -> (i64, i32) { (self.chat_id, self.message_id) }
}
