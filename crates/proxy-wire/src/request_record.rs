//! Dispatcher → worker request records (§4.6).
//!
//! ```text
//! [type:u8][taskID:u32 LE][destLen:u8][dest bytes][0][opLen:u8][op bytes][0][payload…]
//! ```
//!
//! `dest`/`op` are length-prefixed with an explicit trailing `0x00` terminator
//! that is written and consumed deliberately and is not counted in
//! `destLen`/`opLen`. This is a deliberate departure from the original source,
//! which appeared to rely on a `strlen(...)+1`-sized copy past the end of the
//! string buffer — see `SPEC_FULL.md` §9.

use crate::MAX_RECORD_SIZE;

/// The record's `type` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Numeric,
    Str,
    List,
    Generic,
    ForceReconnect,
    Kill,
}

impl RequestKind {
    pub fn tag(self) -> u8 {
        match self {
            RequestKind::Numeric => 0x00,
            RequestKind::Str => 0x01,
            RequestKind::List => 0x02,
            RequestKind::Generic => 0x03,
            RequestKind::ForceReconnect => 0xFE,
            RequestKind::Kill => 0xFF,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, &'static str> {
        match tag {
            0x00 => Ok(RequestKind::Numeric),
            0x01 => Ok(RequestKind::Str),
            0x02 => Ok(RequestKind::List),
            0x03 => Ok(RequestKind::Generic),
            0xFE => Ok(RequestKind::ForceReconnect),
            0xFF => Ok(RequestKind::Kill),
            _ => Err("unknown request record type byte"),
        }
    }
}

/// An element of a `Generic` payload (§4.6: "u8 tag followed by its numeric
/// or string encoding"). The string variant's length byte includes the
/// trailing null terminator in its count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericElement {
    Numeric(u32),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    None,
    Numeric(u32),
    Str(String),
    List(Vec<u32>),
    Generic(Vec<GenericElement>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub task_id: u32,
    pub kind: RequestKind,
    pub dest: String,
    pub op: String,
    pub payload: RequestPayload,
}

impl RequestRecord {
    pub fn new(
        task_id: u32,
        kind: RequestKind,
        dest: impl Into<String>,
        op: impl Into<String>,
        payload: RequestPayload,
    ) -> Self {
        RequestRecord {
            task_id,
            kind,
            dest: dest.into(),
            op: op.into(),
            payload,
        }
    }

    /// Encodes the record. Returns an error if the resulting record would
    /// exceed [`MAX_RECORD_SIZE`] or any string field exceeds 255 bytes.
    pub fn encode(&self) -> Result<Vec<u8>, &'static str> {
        if self.dest.len() > 255 || self.op.len() > 255 {
            return Err("dest/op exceeds 255 bytes");
        }
        let mut out = Vec::with_capacity(16 + self.dest.len() + self.op.len());
        out.push(self.kind.tag());
        out.extend_from_slice(&self.task_id.to_le_bytes());
        out.push(self.dest.len() as u8);
        out.extend_from_slice(self.dest.as_bytes());
        out.push(0x00);
        out.push(self.op.len() as u8);
        out.extend_from_slice(self.op.as_bytes());
        out.push(0x00);
        encode_payload(&self.payload, &mut out)?;
        if out.len() > MAX_RECORD_SIZE {
            return Err("request record exceeds MAX_RECORD_SIZE");
        }
        Ok(out)
    }

    /// Decodes a complete record from `buf`. `buf` must contain exactly one
    /// record (callers responsible for framing/length-delimiting elsewhere).
    pub fn decode(buf: &[u8]) -> Result<Self, &'static str> {
        Self::decode_prefix(buf).map(|(record, _consumed)| record)
    }

    /// Decodes a record from the front of `buf`, returning it along with the
    /// number of bytes it occupied. Unlike [`Self::decode`], this does not
    /// require `buf` to contain exactly one record — callers reading a
    /// continuous stream of back-to-back records use the returned length to
    /// find the start of the next one.
    pub fn decode_prefix(buf: &[u8]) -> Result<(Self, usize), &'static str> {
        if buf.len() < 5 {
            return Err("truncated request record header");
        }
        let kind = RequestKind::from_tag(buf[0])?;
        let task_id = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        let mut pos = 5;

        let (dest, consumed) = read_terminated_string(&buf[pos..])?;
        pos += consumed;
        let (op, consumed) = read_terminated_string(&buf[pos..])?;
        pos += consumed;

        let (payload, consumed) = decode_payload(kind, &buf[pos..])?;
        pos += consumed;

        Ok((
            RequestRecord {
                task_id,
                kind,
                dest,
                op,
                payload,
            },
            pos,
        ))
    }
}

fn read_terminated_string(buf: &[u8]) -> Result<(String, usize), &'static str> {
    if buf.is_empty() {
        return Err("truncated length-prefixed string");
    }
    let len = buf[0] as usize;
    if buf.len() < 1 + len + 1 {
        return Err("truncated length-prefixed string");
    }
    let s = String::from_utf8(buf[1..1 + len].to_vec()).map_err(|_| "string is not valid UTF-8")?;
    if buf[1 + len] != 0x00 {
        return Err("missing string terminator byte");
    }
    Ok((s, 1 + len + 1))
}

fn encode_payload(payload: &RequestPayload, out: &mut Vec<u8>) -> Result<(), &'static str> {
    match payload {
        RequestPayload::None => {}
        RequestPayload::Numeric(v) => out.extend_from_slice(&v.to_le_bytes()),
        RequestPayload::Str(s) => {
            if s.len() > 255 {
                return Err("string payload exceeds 255 bytes");
            }
            out.push(s.len() as u8);
            out.extend_from_slice(s.as_bytes());
        }
        RequestPayload::List(items) => {
            if items.len() > 255 {
                return Err("list payload exceeds 255 elements");
            }
            out.push(items.len() as u8);
            for item in items {
                out.extend_from_slice(&item.to_le_bytes());
            }
        }
        RequestPayload::Generic(elements) => {
            if elements.len() > 255 {
                return Err("generic payload exceeds 255 elements");
            }
            out.push(elements.len() as u8);
            for element in elements {
                match element {
                    GenericElement::Numeric(v) => {
                        out.push(RequestKind::Numeric.tag());
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                    GenericElement::Str(s) => {
                        if s.len() + 1 > 255 {
                            return Err("generic string element exceeds 255 bytes");
                        }
                        out.push(RequestKind::Str.tag());
                        out.push((s.len() + 1) as u8);
                        out.extend_from_slice(s.as_bytes());
                        out.push(0x00);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Decodes the payload for `kind` from the front of `buf`, returning it
/// along with the number of bytes consumed.
fn decode_payload(kind: RequestKind, buf: &[u8]) -> Result<(RequestPayload, usize), &'static str> {
    match kind {
        RequestKind::ForceReconnect | RequestKind::Kill => Ok((RequestPayload::None, 0)),
        RequestKind::Numeric => {
            if buf.len() < 4 {
                return Err("truncated numeric payload");
            }
            Ok((
                RequestPayload::Numeric(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
                4,
            ))
        }
        RequestKind::Str => {
            if buf.is_empty() {
                return Err("truncated string payload");
            }
            let len = buf[0] as usize;
            if buf.len() < 1 + len {
                return Err("truncated string payload");
            }
            let s = String::from_utf8(buf[1..1 + len].to_vec())
                .map_err(|_| "string payload is not valid UTF-8")?;
            Ok((RequestPayload::Str(s), 1 + len))
        }
        RequestKind::List => {
            if buf.is_empty() {
                return Err("truncated list payload");
            }
            let count = buf[0] as usize;
            if buf.len() < 1 + count * 4 {
                return Err("truncated list payload");
            }
            let mut items = Vec::with_capacity(count);
            for i in 0..count {
                let off = 1 + i * 4;
                items.push(u32::from_le_bytes([
                    buf[off],
                    buf[off + 1],
                    buf[off + 2],
                    buf[off + 3],
                ]));
            }
            Ok((RequestPayload::List(items), 1 + count * 4))
        }
        RequestKind::Generic => {
            if buf.is_empty() {
                return Err("truncated generic payload");
            }
            let count = buf[0] as usize;
            let mut pos = 1;
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                if pos >= buf.len() {
                    return Err("truncated generic element");
                }
                let tag = RequestKind::from_tag(buf[pos])?;
                pos += 1;
                match tag {
                    RequestKind::Numeric => {
                        if buf.len() < pos + 4 {
                            return Err("truncated generic numeric element");
                        }
                        elements.push(GenericElement::Numeric(u32::from_le_bytes([
                            buf[pos],
                            buf[pos + 1],
                            buf[pos + 2],
                            buf[pos + 3],
                        ])));
                        pos += 4;
                    }
                    RequestKind::Str => {
                        if pos >= buf.len() {
                            return Err("truncated generic string element");
                        }
                        let len = buf[pos] as usize;
                        pos += 1;
                        if len == 0 || buf.len() < pos + len {
                            return Err("truncated generic string element");
                        }
                        // len includes the trailing null terminator byte.
                        let s = String::from_utf8(buf[pos..pos + len - 1].to_vec())
                            .map_err(|_| "generic string element is not valid UTF-8")?;
                        pos += len;
                        elements.push(GenericElement::Str(s));
                    }
                    _ => return Err("invalid generic element tag"),
                }
            }
            Ok((RequestPayload::Generic(elements), pos))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_record_round_trips() {
        let record = RequestRecord::new(
            7,
            RequestKind::Numeric,
            "summonerService",
            "getAllPublicSummonerDataByAccount",
            RequestPayload::Numeric(42),
        );
        let encoded = record.encode().unwrap();
        let decoded = RequestRecord::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn string_record_round_trips_with_no_payload_terminator() {
        let record = RequestRecord::new(
            1,
            RequestKind::Str,
            "summonerService",
            "getSummonerByName",
            RequestPayload::Str("Honux".to_owned()),
        );
        let encoded = record.encode().unwrap();
        // header: tag(1) + task_id(4) + destLen(1) + dest(16) + term(1)
        //         + opLen(1) + op(17) + term(1)
        // payload: len(1) + "Honux"(5), no trailing terminator byte.
        let expected_len = 1 + 4 + 1 + 16 + 1 + 1 + 17 + 1 + 1 + 5;
        assert_eq!(encoded.len(), expected_len);
        let decoded = RequestRecord::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn list_record_round_trips() {
        let record = RequestRecord::new(
            3,
            RequestKind::List,
            "summonerService",
            "getSummonerIcons",
            RequestPayload::List(vec![1, 2, 3]),
        );
        let encoded = record.encode().unwrap();
        let decoded = RequestRecord::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn generic_record_round_trips_with_terminator_counted_in_length() {
        let record = RequestRecord::new(
            4,
            RequestKind::Generic,
            "playerStatsService",
            "getAggregatedStats",
            RequestPayload::Generic(vec![
                GenericElement::Numeric(99),
                GenericElement::Str("CLASSIC".to_owned()),
                GenericElement::Numeric(3),
            ]),
        );
        let encoded = record.encode().unwrap();
        let decoded = RequestRecord::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn restart_record_is_force_reconnect_with_no_payload_bytes() {
        let record = RequestRecord::new(
            0,
            RequestKind::ForceReconnect,
            "",
            "",
            RequestPayload::None,
        );
        let encoded = record.encode().unwrap();
        // tag(1) + task_id(4) + destLen(1)+term(1) + opLen(1)+term(1), no payload.
        assert_eq!(encoded.len(), 9);
        let decoded = RequestRecord::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn kill_record_decodes_as_kill_kind() {
        let record =
            RequestRecord::new(0, RequestKind::Kill, "", "", RequestPayload::None);
        let encoded = record.encode().unwrap();
        let decoded = RequestRecord::decode(&encoded).unwrap();
        assert_eq!(decoded.kind, RequestKind::Kill);
    }

    #[test]
    fn decode_rejects_missing_terminator() {
        let mut encoded = RequestRecord::new(
            0,
            RequestKind::Str,
            "x",
            "y",
            RequestPayload::Str("z".to_owned()),
        )
        .encode()
        .unwrap();
        // Corrupt the dest terminator byte.
        encoded[6] = 0x41;
        assert!(RequestRecord::decode(&encoded).is_err());
    }

    #[test]
    fn decode_prefix_splits_back_to_back_records() {
        let first = RequestRecord::new(1, RequestKind::Kill, "", "", RequestPayload::None)
            .encode()
            .unwrap();
        let second = RequestRecord::new(
            2,
            RequestKind::Numeric,
            "summonerService",
            "getSummonerByName",
            RequestPayload::Numeric(9),
        )
        .encode()
        .unwrap();
        let mut stream = first.clone();
        stream.extend_from_slice(&second);

        let (decoded_first, consumed) = RequestRecord::decode_prefix(&stream).unwrap();
        assert_eq!(consumed, first.len());
        assert_eq!(decoded_first.task_id, 1);

        let (decoded_second, consumed2) = RequestRecord::decode_prefix(&stream[consumed..]).unwrap();
        assert_eq!(consumed2, second.len());
        assert_eq!(decoded_second.task_id, 2);
    }

    #[test]
    fn encode_rejects_oversized_record() {
        let record = RequestRecord::new(
            0,
            RequestKind::List,
            "x",
            "y",
            RequestPayload::List(vec![0; 255]),
        );
        assert!(record.encode().is_err());
    }
}
