use serde::Serialize;
use tgarchive::MessageRecord;

/// One archived record as printed: ids, text, RFC 3339 timestamp and the
/// hex-encoded key material and packet it was read from.
#[derive(Serialize)]
struct RecordLine<'a> {
    chat_id:    i64,
    user_id:    Option<i64>,
    message_id: i32,
    reply_to:   Option<i32>,
    text:       Option<&'a str>,
    sent_at:    String,
    auth_key:   String,
    session_id: String,
    packet:     String,
}

pub fn to_json_line(record: &MessageRecord) -> serde_json::Result<String> {
    serde_json::to_string(&RecordLine {
        chat_id:    record.chat_id,
        user_id:    record.user_id,
        message_id: record.message_id,
        reply_to:   record.reply_to,
        text:       record.text.as_deref(),
        sent_at:    record.sent_at.to_rfc3339(),
        auth_key:   hex::encode(&record.audit.auth_key),
        session_id: hex::encode(record.audit.session_id),
        packet:     hex::encode(&record.audit.packet),
    })
}
