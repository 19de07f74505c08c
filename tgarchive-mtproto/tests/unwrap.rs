use std::io::Write;

use tgarchive_mtproto::{Failure, UnwrapError, Unwrapper, inflate};
use tgarchive_tl::{DecodeError, Deserializer, LayerSchema, Object, SchemaRegistry, Value, encode};

const LAYERS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../testdata/layers");

fn registry() -> SchemaRegistry {
    SchemaRegistry::load_dir(LAYERS).unwrap()
}

fn pong(ping_id: i64) -> Value {
    Value::Object(Object::new(0x347773c5, "pong").with("msg_id", 1i64).with("ping_id", ping_id))
}

fn container(schema: &LayerSchema, bodies: Vec<Vec<u8>>) -> Value {
    let messages = bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| {
            Value::Object(
                Object::new(0x5bb8e511, "message")
                    .with("msg_id", 1001 + 2 * i as i64)
                    .with("seqno", i as i32)
                    .with("bytes", body.len() as i32)
                    .with("body", body),
            )
        })
        .collect::<Vec<_>>();
    let _ = schema;
    Value::Object(Object::new(0x73f1f8dc, "msg_container").with("messages", messages))
}

fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn gzip_packed(inner: &[u8]) -> Value {
    Value::Object(Object::new(0x3072cfa1, "gzip_packed").with("packed_data", gzip_bytes(inner)))
}

fn ping_ids(values: &[Value]) -> Vec<i64> {
    values
        .iter()
        .filter_map(|v| v.as_object()?.get("ping_id")?.as_i64())
        .collect()
}

#[test]
fn compressed_container_expands_in_wire_order() {
    let reg = registry();
    let schema = reg.layer(200).unwrap();
    let enc = |v: &Value| encode(schema, v).unwrap();

    let inner = enc(&container(schema, vec![enc(&pong(1)), enc(&pong(2)), enc(&pong(3))]));
    let packed = enc(&gzip_packed(&inner));
    let plain = enc(&pong(4));
    let unwrapper = Unwrapper::new(Deserializer::new(schema));

    let first = enc(&container(schema, vec![packed.clone(), plain.clone()]));
    let out = unwrapper.flatten_bytes(&first);
    assert!(out.failures.is_empty());
    assert_eq!(ping_ids(&out.objects), vec![1, 2, 3, 4]);

    let last = enc(&container(schema, vec![plain, packed]));
    let out = unwrapper.flatten_bytes(&last);
    assert_eq!(ping_ids(&out.objects), vec![4, 1, 2, 3]);
}

#[test]
fn compression_inside_compression() {
    let reg = registry();
    let schema = reg.layer(200).unwrap();
    let enc = |v: &Value| encode(schema, v).unwrap();

    let once = enc(&gzip_packed(&enc(&pong(9))));
    let twice = enc(&gzip_packed(&once));

    let out = Unwrapper::new(Deserializer::new(schema)).flatten_bytes(&twice);
    assert_eq!(ping_ids(&out.objects), vec![9]);
}

#[test]
fn broken_entry_only_drops_itself() {
    let reg = registry();
    let schema = reg.layer(200).unwrap();
    let enc = |v: &Value| encode(schema, v).unwrap();

    let unknown = 0xdeadbeefu32.to_le_bytes().to_vec();
    let truncated = enc(&pong(2))[..10].to_vec();
    let bytes = enc(&container(schema, vec![enc(&pong(1)), unknown, truncated, enc(&pong(3))]));

    let out = Unwrapper::new(Deserializer::new(schema)).flatten_bytes(&bytes);
    assert_eq!(ping_ids(&out.objects), vec![1, 3]);
    assert_eq!(out.failures.len(), 2);
    assert_eq!(out.failures[0].msg_id, Some(1003));
    assert!(matches!(
        out.failures[0].error,
        UnwrapError::Decode(DecodeError::TypeNotFound { id: 0xdeadbeef, position: 0, .. })
    ));
    assert_eq!(
        out.failures[1],
        Failure { msg_id: Some(1005), error: UnwrapError::Decode(DecodeError::BufferExhausted) }
    );
}

#[test]
fn rpc_results_are_unwrapped() {
    let reg = registry();
    let schema = reg.layer(200).unwrap();

    let rpc = Value::Object(Object::new(0xf35c6d01, "rpc_result").with("req_msg_id", 77i64).with("result", pong(5)));
    let bytes = encode(schema, &rpc).unwrap();

    let out = Unwrapper::new(Deserializer::new(schema)).flatten_bytes(&bytes);
    assert_eq!(ping_ids(&out.objects), vec![5]);
}

#[test]
fn terminal_objects_pass_through() {
    let reg = registry();
    let schema = reg.layer(200).unwrap();
    let out = Unwrapper::new(Deserializer::new(schema)).flatten(pong(6));
    assert_eq!(out.objects, vec![pong(6)]);
}

#[test]
fn nesting_limit() {
    let reg = registry();
    let schema = reg.layer(200).unwrap();
    let enc = |v: &Value| encode(schema, v).unwrap();

    let mut bytes = enc(&pong(1));
    for _ in 0..3 {
        bytes = enc(&gzip_packed(&bytes));
    }

    let out = Unwrapper::new(Deserializer::new(schema)).with_max_nesting(2).flatten_bytes(&bytes);
    assert!(out.objects.is_empty());
    assert_eq!(out.failures[0].error, UnwrapError::NestingTooDeep { limit: 2 });
}

#[test]
fn zlib_payloads_are_accepted() {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    enc.write_all(b"payload").unwrap();
    let zlib = enc.finish().unwrap();

    assert_eq!(inflate(&zlib).unwrap(), b"payload");
    assert_eq!(inflate(&gzip_bytes(b"payload")).unwrap(), b"payload");
    assert!(matches!(inflate(b"not compressed"), Err(UnwrapError::Decompression(_))));
}
