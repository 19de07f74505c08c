use std::io::Write;
use std::sync::Arc;

use chrono::DateTime;
use tgarchive::tl::{DecodeError, Object, SchemaRegistry, Value, encode};
use tgarchive::{MemoryStore, MessageRecord, Packet, PacketError, Pipeline, archive, chat_to_channel_id, extract};
use tgarchive_crypto::AuthKey;
use tgarchive_mtproto::{Envelope, seal};

const LAYERS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../testdata/layers");
const LAYER: i32 = 200;
const SESSION_ID: i64 = 0x1122334455667788;
const CHANNEL: i64 = 1234567890;
const USER: i64 = 777;
const DATE: i32 = 1_700_000_000;

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::load_dir(LAYERS).unwrap())
}

fn key_bytes() -> Vec<u8> {
    (0..256).map(|i| (i * 7 + 3) as u8).collect()
}

fn peer_channel(id: i64) -> Object {
    Object::new(0xa2a5371e, "peerChannel").with("channel_id", id)
}

fn peer_user(id: i64) -> Object {
    Object::new(0x59511722, "peerUser").with("user_id", id)
}

fn entity(id: u32, name: &str, offset: i32, length: i32) -> Value {
    Value::Object(Object::new(id, name).with("offset", offset).with("length", length))
}

fn message_from(id: i32, text: &str, peer: Object, from: Option<Object>) -> Object {
    let mut msg = Object::new(0x96fdbbe9, "message").with("id", id);
    if let Some(from) = from {
        msg = msg.with("from_id", from);
    }
    msg.with("peer_id", peer).with("date", DATE).with("message", text)
}

fn message(id: i32, text: &str) -> Object {
    message_from(id, text, peer_channel(CHANNEL), Some(peer_user(USER)))
}

fn user(id: i64, bot: bool) -> Value {
    Value::Object(Object::new(0x4b46c37e, "user").with("bot", bot).with("id", id))
}

fn updates(messages: Vec<Object>, users: Vec<Value>) -> Value {
    let events = messages
        .into_iter()
        .map(|m| {
            Value::Object(
                Object::new(0x62ba04d9, "updateNewChannelMessage")
                    .with("message", m)
                    .with("pts", 10)
                    .with("pts_count", 1),
            )
        })
        .collect::<Vec<_>>();
    Value::Object(
        Object::new(0x74ae4240, "updates")
            .with("updates", events)
            .with("users", users)
            .with("chats", Vec::<Value>::new())
            .with("date", DATE)
            .with("seq", 0),
    )
}

fn container(bodies: Vec<Vec<u8>>) -> Value {
    let messages = bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| {
            Value::Object(
                Object::new(0x5bb8e511, "message")
                    .with("msg_id", 0x6000_0000_0000_0001 + 4 * i as i64)
                    .with("seqno", 1)
                    .with("body", body),
            )
        })
        .collect::<Vec<_>>();
    Value::Object(Object::new(0x73f1f8dc, "msg_container").with("messages", messages))
}

fn gzip_packed(inner: Vec<u8>) -> Value {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(&inner).unwrap();
    Value::Object(Object::new(0x3072cfa1, "gzip_packed").with("packed_data", enc.finish().unwrap()))
}

fn body(value: &Value) -> Vec<u8> {
    let reg = registry();
    encode(reg.layer(LAYER).unwrap(), value).unwrap()
}

fn packet_with_body(body: Vec<u8>) -> Packet {
    let envelope = Envelope { salt: 1, session_id: SESSION_ID, msg_id: 0x6000_0000_0000_0001, seq_no: 2, body };
    let key = AuthKey::from_slice(&key_bytes()).unwrap();
    Packet {
        layer:      LAYER,
        auth_key:   key_bytes(),
        session_id: SESSION_ID.to_le_bytes(),
        data:       seal(&envelope, &key),
    }
}

fn packet(value: &Value) -> Packet {
    packet_with_body(body(value))
}

fn process(packet: &Packet) -> Result<tgarchive::Processed, PacketError> {
    Pipeline::new(registry()).process(packet)
}

// ─── Extraction through the pipeline ─────────────────────────────────────────

#[test]
fn new_channel_message_becomes_a_record() {
    let msg = message(42, "hi there").with(
        "entities",
        vec![entity(0xbd610bc9, "messageEntityBold", 0, 2), entity(0x826f8b60, "messageEntityItalic", 3, 5)],
    );
    let packet = packet(&updates(vec![msg], vec![user(USER, false)]));

    let out = process(&packet).unwrap();
    assert_eq!(out.msg_id, 0x6000_0000_0000_0001);
    assert!(out.failures.is_empty());
    assert_eq!(out.records.len(), 1);

    let record = &out.records[0];
    assert_eq!(record.chat_id, -1_001_234_567_890);
    assert_eq!(chat_to_channel_id(record.chat_id), CHANNEL);
    assert_eq!(record.user_id, Some(USER));
    assert_eq!(record.message_id, 42);
    assert_eq!(record.reply_to, None);
    assert_eq!(record.text.as_deref(), Some("**hi** __there__"));
    assert_eq!(record.sent_at, DateTime::from_timestamp(i64::from(DATE), 0).unwrap());
    assert_eq!(&*record.audit.packet, packet.data.as_slice());
    assert_eq!(&*record.audit.auth_key, key_bytes().as_slice());
    assert_eq!(record.audit.session_id, SESSION_ID.to_le_bytes());
}

#[test]
fn bot_senders_are_dropped() {
    let out = process(&packet(&updates(vec![message(1, "beep")], vec![user(USER, true)]))).unwrap();
    assert!(out.records.is_empty());
    assert_eq!(out.objects.len(), 1);
}

#[test]
fn unknown_senders_are_kept() {
    let out = process(&packet(&updates(vec![message(1, "who")], vec![user(USER + 1, true)]))).unwrap();
    assert_eq!(out.records.len(), 1);
}

#[test]
fn replies_link_only_within_the_chat() {
    let same_chat = Object::new(0xafbc09db, "messageReplyHeader").with("reply_to_msg_id", 5);
    let other_chat = Object::new(0xafbc09db, "messageReplyHeader")
        .with("reply_to_msg_id", 6)
        .with("reply_to_peer_id", peer_channel(99));

    let out = process(&packet(&updates(
        vec![message(1, "a").with("reply_to", same_chat), message(2, "b").with("reply_to", other_chat)],
        vec![],
    )))
    .unwrap();

    let replies: Vec<_> = out.records.iter().map(|r| r.reply_to).collect();
    assert_eq!(replies, vec![Some(5), None]);
}

#[test]
fn only_channel_messages_from_users() {
    let private = message_from(1, "dm", peer_user(5), Some(peer_user(USER)));
    let group = message_from(2, "group", Object::new(0x36c6019a, "peerChat").with("chat_id", 6i64), Some(peer_user(USER)));
    let anonymous = message_from(3, "admin", peer_channel(CHANNEL), None);
    let channel_sender = message_from(4, "as channel", peer_channel(CHANNEL), Some(peer_channel(8)));

    let out = process(&packet(&updates(vec![private, group, anonymous, channel_sender, message(5, "ok")], vec![]))).unwrap();
    let ids: Vec<_> = out.records.iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![5]);
}

#[test]
fn empty_text_has_no_markup() {
    let out = process(&packet(&updates(vec![message(9, "")], vec![]))).unwrap();
    assert_eq!(out.records[0].text, None);
}

#[test]
fn channel_difference_inside_compressed_rpc_result() {
    let diff = Value::Object(
        Object::new(0x2064674e, "updates.channelDifference")
            .with("pts", 100)
            .with("new_messages", vec![Value::Object(message(11, "one")), Value::Object(message(12, "two"))])
            .with("other_updates", Vec::<Value>::new())
            .with("chats", Vec::<Value>::new())
            .with("users", vec![user(USER, false)]),
    );
    let rpc = Value::Object(Object::new(0xf35c6d01, "rpc_result").with("req_msg_id", 4i64).with("result", gzip_packed(body(&diff))));

    let too_long = Value::Object(
        Object::new(0xa4bcc6fe, "updates.channelDifferenceTooLong")
            .with("messages", vec![Value::Object(message(13, "three"))])
            .with("chats", Vec::<Value>::new())
            .with("users", Vec::<Value>::new()),
    );

    let out = process(&packet(&container(vec![body(&rpc), body(&too_long)]))).unwrap();
    let ids: Vec<_> = out.records.iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![11, 12, 13]);
}

#[test]
fn broken_entry_does_not_lose_its_siblings() {
    let good = body(&updates(vec![message(1, "kept")], vec![]));
    let unknown = 0x0badf00du32.to_le_bytes().to_vec();
    let truncated = good[..good.len() - 3].to_vec();

    let out = process(&packet(&container(vec![unknown, good.clone(), truncated]))).unwrap();
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.failures.len(), 2);
    assert!(out.failures[0].error.to_string().contains("0x0badf00d"));
}

// ─── Packet-level failures ───────────────────────────────────────────────────

#[test]
fn unsupported_layer_is_rejected_before_decoding() {
    let packet = Packet { layer: 1, auth_key: vec![], session_id: [0; 8], data: vec![] };
    assert_eq!(process(&packet), Err(PacketError::UnsupportedLayer(1)));
}

#[test]
fn auth_key_must_be_256_bytes() {
    let packet = Packet { auth_key: vec![1; 32], ..packet(&updates(vec![], vec![])) };
    assert_eq!(process(&packet), Err(PacketError::InvalidAuthKey(32)));
}

#[test]
fn tampering_and_wrong_session_are_fatal() {
    let good = packet(&updates(vec![message(1, "x")], vec![]));

    let mut tampered = good.clone();
    let last = tampered.data.len() - 1;
    tampered.data[last] ^= 0xff;
    assert_eq!(process(&tampered), Err(PacketError::Integrity));

    let wrong_session = Packet { session_id: [9; 8], ..good.clone() };
    assert!(matches!(process(&wrong_session), Err(PacketError::SessionMismatch { found: SESSION_ID, .. })));

    let wrong_key = Packet { auth_key: vec![0; 256], ..good };
    assert_eq!(process(&wrong_key), Err(PacketError::AuthKeyMismatch));
}

#[test]
fn undecodable_root_fails_the_packet() {
    let out = process(&packet_with_body(0xcafebabeu32.to_le_bytes().to_vec()));
    assert!(matches!(out, Err(PacketError::Decode(DecodeError::TypeNotFound { id: 0xcafebabe, .. }))));
}

#[test]
fn depth_cap_applies_to_packets() {
    let packet = packet(&updates(vec![message(1, "deep")], vec![]));
    let out = Pipeline::new(registry()).with_max_depth(3).process(&packet);
    assert!(matches!(out, Err(PacketError::Decode(DecodeError::MaxDepthExceeded { limit: 3 }))));
}

// ─── Extraction and storage ──────────────────────────────────────────────────

#[test]
fn updates_combined_and_unrelated_shapes() {
    let combined = Value::Object(
        Object::new(0x725b04c3, "updatesCombined")
            .with("updates", vec![Value::Object(
                Object::new(0x62ba04d9, "updateNewChannelMessage").with("message", message(3, "c")),
            )])
            .with("users", Vec::<Value>::new()),
    );
    let pong = Value::Object(Object::new(0x347773c5, "pong").with("msg_id", 1i64).with("ping_id", 2i64));

    let records = extract(&[pong, combined, Value::Bool(true)], LAYER);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message_id, 3);
    assert!(records[0].audit.packet.is_empty());
}

#[test]
fn archiving_twice_inserts_once() {
    let packet = packet(&updates(vec![message(1, "a"), message(2, "b")], vec![]));
    let store = MemoryStore::new();

    let first = archive(process(&packet).unwrap().records, &store).unwrap();
    let second = archive(process(&packet).unwrap().records, &store).unwrap();

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
    let stored: Vec<MessageRecord> = store.messages().unwrap();
    assert_eq!(stored, first);
    assert!(store.has_user(USER).unwrap());
    assert!(store.has_chat(-1_001_234_567_890).unwrap());
}
