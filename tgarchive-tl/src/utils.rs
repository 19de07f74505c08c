//! Constructor ids for definitions written without an explicit `#id`.

/// CRC32 of the normalised definition line, `= Type` included.
///
/// Normalisation drops `flags.N?true` parameters, spells `bytes` as
/// `string`, and flattens generic brackets (`Vector<long>` → `Vector long`).
pub(crate) fn tl_id(definition: &str) -> u32 {
    let words: Vec<&str> = definition
        .split_whitespace()
        .filter(|tok| !is_true_flag(tok))
        .collect();

    let line = words
        .join(" ")
        .replace(":bytes ", ":string ")
        .replace("?bytes ", "?string ")
        .replace('<', " ")
        .replace(['>', '{', '}'], "");
    crc32(line.as_bytes())
}

fn is_true_flag(token: &str) -> bool {
    token
        .split_once(':')
        .and_then(|(_, ty)| ty.split_once('?'))
        .is_some_and(|(flag, ty)| ty == "true" && flag.contains('.'))
}

/// Standard CRC-32 (ISO 3309 / ITU-T V.42).
pub(crate) fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}
