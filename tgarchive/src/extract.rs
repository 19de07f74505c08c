//! Pull channel messages out of decoded updates.

use chrono::DateTime;
use tgarchive_tl::{Object, Value};

use crate::markup::{EntitySpan, reconstruct};
use crate::record::{Audit, MessageRecord, channel_to_chat_id};

/// Extract the channel messages carried by `objects`.
///
/// Recognised shapes are `updates`/`updatesCombined` (their
/// `updateNewChannelMessage` events) and `updates.channelDifference` /
/// `updates.channelDifferenceTooLong`. Everything else yields nothing.
/// Records come back without audit data; see [`MessageRecord::audit`].
pub fn extract(objects: &[Value], layer: i32) -> Vec<MessageRecord> {
    let mut records = Vec::new();

    for obj in objects.iter().filter_map(Value::as_object) {
        let messages: Vec<&Value> = match &*obj.name {
            "updates" | "updatesCombined" => vector(obj, "updates")
                .iter()
                .filter_map(Value::as_object)
                .filter(|u| u.is("updateNewChannelMessage"))
                .filter_map(|u| u.get("message"))
                .collect(),
            "updates.channelDifference" => vector(obj, "new_messages").iter().collect(),
            "updates.channelDifferenceTooLong" => vector(obj, "messages").iter().collect(),
            _ => continue,
        };
        let users = vector(obj, "users");

        records.extend(
            messages
                .into_iter()
                .filter_map(Value::as_object)
                .filter_map(|m| message_record(m, users, layer)),
        );
    }

    records
}

fn vector<'a>(obj: &'a Object, field: &str) -> &'a [Value] {
    obj.get(field).and_then(Value::as_vector).unwrap_or_default()
}

fn peer_id(obj: &Object, field: &str, kind: &str, id_field: &str) -> Option<i64> {
    let peer = obj.get(field)?.as_object()?;
    if !peer.is(kind) {
        return None;
    }
    peer.get(id_field)?.as_i64()
}

fn message_record(message: &Object, users: &[Value], layer: i32) -> Option<MessageRecord> {
    if !message.is("message") {
        return None;
    }
    let id = message.get("id")?.as_i64()? as i32;

    let Some(channel_id) = peer_id(message, "peer_id", "peerChannel", "channel_id") else {
        tracing::debug!("[extract] layer {layer}: message {id} is not from a channel, skipping");
        return None;
    };
    let Some(user_id) = peer_id(message, "from_id", "peerUser", "user_id") else {
        tracing::debug!("[extract] layer {layer}: message {id} in channel {channel_id} has no user sender, skipping");
        return None;
    };

    let sender = users
        .iter()
        .filter_map(Value::as_object)
        .find(|u| u.is("user") && u.get("id").and_then(Value::as_i64) == Some(user_id));
    if sender.is_some_and(|u| u.flag("bot")) {
        tracing::debug!("[extract] dropping message {id} from bot {user_id}");
        return None;
    }

    let chat_id = channel_to_chat_id(channel_id);
    let sent_at = DateTime::from_timestamp(message.get("date")?.as_i64()?, 0)?;

    Some(MessageRecord {
        chat_id,
        user_id: Some(user_id),
        message_id: id,
        reply_to: reply_to(message, chat_id),
        text: text(message),
        sent_at,
        audit: Audit::default(),
    })
}

/// The replied-to message id, for replies within the same chat only.
fn reply_to(message: &Object, chat_id: i64) -> Option<i32> {
    let header = message.get("reply_to")?.as_object()?;
    if !header.is("messageReplyHeader") {
        return None;
    }
    if header.get("reply_to_peer_id").is_some() {
        tracing::debug!("[extract] {chat_id}: cross-chat reply, not linked");
        return None;
    }
    header.get("reply_to_msg_id")?.as_i64().map(|id| id as i32)
}

fn text(message: &Object) -> Option<String> {
    let raw = message.get("message")?.as_str().filter(|s| !s.is_empty())?;
    let spans: Vec<EntitySpan> = vector(message, "entities")
        .iter()
        .filter_map(Value::as_object)
        .filter_map(EntitySpan::from_object)
        .collect();
    Some(reconstruct(raw, &spans))
}
