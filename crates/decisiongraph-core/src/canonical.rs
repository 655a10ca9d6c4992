//! Deterministic byte representation of structured values (RFC 8785 JCS).
//!
//! Two independent implementations hashing the same logical value must
//! produce byte-identical output, or seals stop being portable. The rules:
//! strings normalized to UTF-8 NFC, object keys sorted by code point of
//! their NFC form, no whitespace, integers emitted without a decimal point,
//! floating-point numbers rejected outright. Normalization means an `é`
//! arriving as U+00E9 and one arriving as `e` + U+0301 emit the same bytes.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::error::DgError;

/// Emit RFC 8785 canonical bytes for `value`.
///
/// Fails with `FloatRejected` if any number in the tree is not an integer —
/// floats have no canonical text form that survives cross-platform rounding,
/// so they are banned from hashed payloads entirely.
pub fn to_canonical_bytes(value: &Value) -> Result<Vec<u8>, DgError> {
    let mut out = Vec::with_capacity(256);
    emit(value, "$", &mut out)?;
    Ok(out)
}

/// Walk `value` and reject any IEEE-754 float. `path` seeds the error
/// location, e.g. `fact.object`.
pub fn assert_no_floats(value: &Value, path: &str) -> Result<(), DgError> {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ok(())
            } else {
                Err(DgError::FloatRejected(path.to_string()))
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                assert_no_floats(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (k, v) in map {
                assert_no_floats(v, &format!("{path}.{k}"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn emit(value: &Value, path: &str, out: &mut Vec<u8>) -> Result<(), DgError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                out.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(DgError::FloatRejected(path.to_string()));
            }
        }
        Value::String(s) => emit_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                emit(item, &format!("{path}[{i}]"), out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Keys compare in their NFC form, sorted by Unicode code point
            // (UTF-8 byte order coincides), so two normalization spellings
            // of the same key cannot land in different positions.
            let mut entries: Vec<(String, &String)> = map
                .keys()
                .map(|key| (key.nfc().collect::<String>(), key))
                .collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            out.push(b'{');
            for (i, (_, key)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                emit_string(key, out);
                out.push(b':');
                emit(&map[key.as_str()], &format!("{path}.{key}"), out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Normalize to NFC, then apply minimal JSON string escaping: `"` and `\`
/// escaped, control characters via the two-char shorthands where one exists,
/// `\u00xx` otherwise. Everything else is literal UTF-8.
fn emit_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.nfc() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\u{0c}' => out.extend_from_slice(b"\\f"),
            '\r' => out.extend_from_slice(b"\\r"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_is_canonical() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":2,"z":{"y":3,"x":4}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"z":{"x":4,"y":3},"a":2,"b":1}"#).unwrap();
        assert_eq!(to_canonical_bytes(&a).unwrap(), to_canonical_bytes(&b).unwrap());
        assert_eq!(
            to_canonical_bytes(&a).unwrap(),
            br#"{"a":2,"b":1,"z":{"x":4,"y":3}}"#
        );
    }

    #[test]
    fn integers_emit_without_decimal_point() {
        let v = json!({"n": 150000, "neg": -7, "big": 9_007_199_254_740_993u64});
        let bytes = to_canonical_bytes(&v).unwrap();
        assert_eq!(bytes, br#"{"big":9007199254740993,"n":150000,"neg":-7}"#);
    }

    #[test]
    fn floats_are_rejected_with_a_path() {
        let v = json!({"outer": {"inner": [1, 2, 0.5]}});
        match to_canonical_bytes(&v).unwrap_err() {
            DgError::FloatRejected(path) => assert_eq!(path, "$.outer.inner[2]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn control_characters_escape() {
        let v = json!({"s": "a\"b\\c\nd\u{01}e"});
        let bytes = to_canonical_bytes(&v).unwrap();
        assert_eq!(bytes, b"{\"s\":\"a\\\"b\\\\c\\nd\\u0001e\"}");
    }

    #[test]
    fn unicode_passes_through_as_utf8() {
        let v = json!({"name": "Zoë"});
        let bytes = to_canonical_bytes(&v).unwrap();
        assert_eq!(bytes, "{\"name\":\"Zoë\"}".as_bytes());
    }

    #[test]
    fn nfd_and_nfc_values_emit_identical_bytes() {
        // "é" precomposed (U+00E9) vs decomposed ("e" + U+0301).
        let nfc = json!({"name": "Andr\u{00e9}"});
        let nfd = json!({"name": "Andre\u{0301}"});
        let a = to_canonical_bytes(&nfc).unwrap();
        let b = to_canonical_bytes(&nfd).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "{\"name\":\"André\"}".as_bytes());
    }

    #[test]
    fn nfd_and_nfc_keys_emit_identical_bytes_and_order() {
        // A decomposed key must land in the same sorted position as its
        // precomposed spelling, relative to neighbouring keys.
        let nfc: Value =
            serde_json::from_str("{\"r\u{00e9}gion\":1,\"rz\":2,\"ra\":3}").unwrap();
        let nfd: Value =
            serde_json::from_str("{\"re\u{0301}gion\":1,\"rz\":2,\"ra\":3}").unwrap();
        assert_eq!(to_canonical_bytes(&nfc).unwrap(), to_canonical_bytes(&nfd).unwrap());
    }
}
