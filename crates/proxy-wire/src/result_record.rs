//! Worker → dispatcher result records (§4.6, §6).
//!
//! ```text
//! [0x01][taskID:u32 LE][responseSize:u32 LE][body…]
//! ```
//!
//! The header is fixed at 9 bytes; `body` may be shorter than `responseSize`
//! in a single write, with the remainder arriving as raw continuation bytes
//! (no further header) on subsequent reads. Buffering that continuation
//! across reads is a stateful, per-worker concern and lives in
//! `services/dispatcher` rather than in this crate.

pub const RESULT_RECORD_HEADER_LEN: usize = 9;
pub const RESULT_RECORD_START_BYTE: u8 = 0x01;

/// A parsed result record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultHeader {
    pub task_id: u32,
    pub response_size: u32,
}

impl ResultHeader {
    /// Parses a 9-byte header. Returns an error if `buf` is too short or the
    /// start byte doesn't match.
    pub fn parse(buf: &[u8]) -> Result<Self, &'static str> {
        if buf.len() < RESULT_RECORD_HEADER_LEN {
            return Err("truncated result record header");
        }
        if buf[0] != RESULT_RECORD_START_BYTE {
            return Err("result record does not start with 0x01");
        }
        let task_id = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        let response_size = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);
        Ok(ResultHeader {
            task_id,
            response_size,
        })
    }
}

/// Builds a complete result record (header + full body inline). Used by test
/// fixtures and by the worker when the whole reply is available at once; a
/// worker streaming a reply as it arrives writes the header once and then
/// raw body bytes directly, without calling this helper again.
pub fn encode_result_record(task_id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RESULT_RECORD_HEADER_LEN + body.len());
    out.push(RESULT_RECORD_START_BYTE);
    out.extend_from_slice(&task_id.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let record = encode_result_record(5, b"hello world");
        let header = ResultHeader::parse(&record).unwrap();
        assert_eq!(header.task_id, 5);
        assert_eq!(header.response_size, 11);
        assert_eq!(&record[RESULT_RECORD_HEADER_LEN..], b"hello world");
    }

    #[test]
    fn parse_rejects_wrong_start_byte() {
        let mut record = encode_result_record(1, b"x");
        record[0] = 0x02;
        assert!(ResultHeader::parse(&record).is_err());
    }

    #[test]
    fn parse_rejects_truncated_header() {
        assert!(ResultHeader::parse(&[0x01, 0, 0]).is_err());
    }
}
