//! Partial AMF0/AMF3 encoder: just enough to build the outbound invocations
//! the worker sends to the upstream server (method calls, login/connect
//! requests). There is no round-trip requirement with the decoder's
//! reference-table compression — every value here is written inline, which
//! the upstream server accepts (reference tables are an optional compression
//! the spec never requires on the wire).

use serde_json::Value;

/// Encodes a JSON value as an AMF0 value. Objects become typed objects with
/// an empty class name (anonymous object), arrays become AMF0 strict arrays.
pub fn encode_amf0_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(0x05),
        Value::Bool(b) => {
            out.push(0x01);
            out.push(u8::from(*b));
        }
        Value::Number(n) => {
            out.push(0x00);
            out.extend_from_slice(&n.as_f64().unwrap_or(0.0).to_be_bytes());
        }
        Value::String(s) => encode_amf0_string(s, out),
        Value::Array(items) => {
            out.push(0x0A); // strict array marker
            out.extend_from_slice(&(items.len() as u32).to_be_bytes());
            for item in items {
                encode_amf0_value(item, out);
            }
        }
        Value::Object(map) => {
            out.push(0x03);
            for (key, val) in map {
                write_amf0_utf8(key, out);
                encode_amf0_value(val, out);
            }
            out.extend_from_slice(&[0x00, 0x00, 0x09]);
        }
    }
}

fn encode_amf0_string(s: &str, out: &mut Vec<u8>) {
    if s.len() > u16::MAX as usize {
        out.push(0x0C); // long string marker
        out.extend_from_slice(&(s.len() as u32).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    } else {
        out.push(0x02);
        write_amf0_utf8(s, out);
    }
}

fn write_amf0_utf8(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Encodes a u29 varint per §4.9 (up to 4 bytes, 4th byte carries a full 8
/// bits of payload).
pub fn encode_u29(value: u32, out: &mut Vec<u8>) {
    let value = value & 0x1FFF_FFFF;
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push(((value >> 7) | 0x80) as u8);
        out.push((value & 0x7F) as u8);
    } else if value < 0x20_0000 {
        out.push(((value >> 14) | 0x80) as u8);
        out.push((((value >> 7) & 0x7F) | 0x80) as u8);
        out.push((value & 0x7F) as u8);
    } else {
        out.push(((value >> 22) | 0x80) as u8);
        out.push((((value >> 15) & 0x7F) | 0x80) as u8);
        out.push((((value >> 8) & 0x7F) | 0x80) as u8);
        out.push((value & 0xFF) as u8);
    }
}

/// Encodes a JSON value as an AMF3 value, always inline (never consulting or
/// populating a reference table).
pub fn encode_amf3_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(0x01),
        Value::Bool(false) => out.push(0x02),
        Value::Bool(true) => out.push(0x03),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if (-(1i64 << 28)..(1i64 << 28)).contains(&i) {
                    out.push(0x04);
                    encode_u29((i as i32 as u32) & 0x1FFF_FFFF, out);
                    return;
                }
            }
            out.push(0x05);
            out.extend_from_slice(&n.as_f64().unwrap_or(0.0).to_be_bytes());
        }
        Value::String(s) => {
            out.push(0x06);
            encode_u29(((s.len() as u32) << 1) | 1, out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            out.push(0x09);
            encode_u29(((items.len() as u32) << 1) | 1, out);
            out.push(0x01); // empty associative part
            for item in items {
                encode_amf3_value(item, out);
            }
        }
        Value::Object(map) => {
            out.push(0x0A);
            // Dynamic anonymous object: ref-header=1, traits-inline=0b0011
            // (dynamic, no sealed members, class-name empty).
            out.push(0x0B);
            out.push(0x01); // empty class name
            for (key, val) in map {
                encode_u29(((key.len() as u32) << 1) | 1, out);
                out.extend_from_slice(key.as_bytes());
                encode_amf3_value(val, out);
            }
            out.push(0x01); // end of dynamic members (empty string key)
        }
    }
}

/// Builds an AMF0-wrapped remote method invocation: an optional header
/// block, then target, response, argument count marker, and the argument
/// array, matching the shape the upstream server expects for
/// `connect`/`Login`/named-method calls.
///
/// `headers` carries the AMF0 header section (name, must-understand, value)
/// that precedes the body — used to attach the `DSId` the `connect` reply
/// hands back on every invocation sent after it (§4.7 step 4).
pub fn encode_invocation(target: &str, response: &str, args: &[Value], headers: &[(String, Value)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(headers.len() as u16).to_be_bytes());
    for (name, value) in headers {
        write_amf0_utf8(name, &mut out);
        out.push(0); // must-understand: false
        out.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // length: unknown
        encode_amf0_value(value, &mut out);
    }
    encode_amf0_value(&Value::String(target.to_owned()), &mut out);
    encode_amf0_value(&Value::String(response.to_owned()), &mut out);
    out.push(0x0A);
    out.extend_from_slice(&(args.len() as u32).to_be_bytes());
    for arg in args {
        encode_amf0_value(arg, &mut out);
    }
    out
}
