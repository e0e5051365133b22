//! AMF0 decoding (§4.9), including the switchover into AMF3 on marker `0x11`.

use serde_json::{Map, Value};

use crate::amf3;
use crate::{AmfError, Decoder};

pub fn decode_amf0_message(buf: &[u8]) -> Result<Value, AmfError> {
    let mut dec = Decoder::new();
    let (value, _) = decode_value(buf, &mut dec)?;
    Ok(value)
}

pub fn decode_value(buf: &[u8], dec: &mut Decoder) -> Result<(Value, usize), AmfError> {
    if buf.is_empty() {
        return Err(AmfError::Truncated);
    }
    match buf[0] {
        0x00 => {
            if buf.len() < 9 {
                return Err(AmfError::Truncated);
            }
            let v = f64::from_be_bytes(buf[1..9].try_into().expect("checked above"));
            Ok((
                serde_json::Number::from_f64(v)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                9,
            ))
        }
        0x01 => {
            if buf.len() < 2 {
                return Err(AmfError::Truncated);
            }
            Ok((Value::Bool(buf[1] != 0), 2))
        }
        0x02 => {
            if buf.len() < 3 {
                return Err(AmfError::Truncated);
            }
            let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
            if buf.len() < 3 + len {
                return Err(AmfError::Truncated);
            }
            let s =
                String::from_utf8(buf[3..3 + len].to_vec()).map_err(|_| AmfError::InvalidUtf8)?;
            Ok((Value::String(s), 3 + len))
        }
        0x03 => decode_typed_object(&buf[1..], dec).map(|(v, n)| (v, 1 + n)),
        0x05 => Ok((Value::Null, 1)),
        0x11 => amf3::decode_value(&buf[1..], dec).map(|(v, n)| (v, 1 + n)),
        other => Err(AmfError::InvalidMarker(other)),
    }
}

/// A `0x03` typed object: a run of `u16`-length-prefixed key/value pairs,
/// terminated by a zero-length key and a trailing byte (the AMF0 object-end
/// marker).
fn decode_typed_object(buf: &[u8], dec: &mut Decoder) -> Result<(Value, usize), AmfError> {
    let mut pos = 0;
    let mut map = Map::new();
    loop {
        if buf.len() < pos + 2 {
            return Err(AmfError::Truncated);
        }
        let len = u16::from_be_bytes([buf[pos], buf[pos + 1]]) as usize;
        pos += 2;
        if len == 0 {
            if buf.len() < pos + 1 {
                return Err(AmfError::Truncated);
            }
            pos += 1; // trailing object-end marker byte
            break;
        }
        if buf.len() < pos + len {
            return Err(AmfError::Truncated);
        }
        let key =
            String::from_utf8(buf[pos..pos + len].to_vec()).map_err(|_| AmfError::InvalidUtf8)?;
        pos += len;
        let (value, n) = decode_value(&buf[pos..], dec)?;
        pos += n;
        map.insert(key, value);
    }
    Ok((Value::Object(map), pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_boolean_string_null() {
        let mut dec = Decoder::new();
        let mut num = vec![0x00];
        num.extend_from_slice(&42.5f64.to_be_bytes());
        assert_eq!(decode_value(&num, &mut dec).unwrap().0, json!(42.5));

        assert_eq!(
            decode_value(&[0x01, 0x01], &mut dec).unwrap().0,
            json!(true)
        );
        assert_eq!(
            decode_value(&[0x01, 0x00], &mut dec).unwrap().0,
            json!(false)
        );

        let mut s = vec![0x02, 0x00, 0x05];
        s.extend_from_slice(b"Honux");
        assert_eq!(decode_value(&s, &mut dec).unwrap().0, json!("Honux"));

        assert_eq!(decode_value(&[0x05], &mut dec).unwrap().0, Value::Null);
    }

    #[test]
    fn typed_object_decodes_keys_in_order() {
        let mut dec = Decoder::new();
        let mut buf = vec![0x03];
        buf.extend_from_slice(&[0x00, 0x04]);
        buf.extend_from_slice(b"name");
        buf.extend_from_slice(&[0x02, 0x00, 0x05]);
        buf.extend_from_slice(b"Honux");
        buf.extend_from_slice(&[0x00, 0x00, 0x09]); // empty key + trailing marker
        let (v, _) = decode_value(&buf, &mut dec).unwrap();
        assert_eq!(v, json!({"name": "Honux"}));
    }

    #[test]
    fn switches_to_amf3_on_0x11() {
        let mut dec = Decoder::new();
        let buf = vec![0x11, 0x04, 7]; // AMF3 integer 7
        let (v, n) = decode_value(&buf, &mut dec).unwrap();
        assert_eq!(v, json!(7));
        assert_eq!(n, 3);
    }
}
