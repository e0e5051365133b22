//! RTMP-style chunk framing for outbound messages to the upstream server
//! (§4.8), the write-side counterpart to `proxy_wire::upstream_frame`.
//!
//! Every outbound message gets a full 12-byte header followed by its body
//! split into 128-byte chunks, each subsequent chunk preceded by a `0xC3`
//! continuation marker. The worker always sends full headers; it has no
//! need to economise on header bytes the way the upstream server does on
//! replies.

const CHUNK_BODY_SIZE: usize = 128;
const CONTINUATION_MARKER: u8 = 0xC3;

/// Encodes a single logical message as a chunked byte stream ready to write
/// to the upstream socket.
pub fn encode_chunked_message(message_type: u8, stream_id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + body.len() + body.len() / CHUNK_BODY_SIZE);

    out.push(0x00); // fmt=00, chunk stream id low bits unused here
    out.extend_from_slice(&[0, 0, 0]); // timestamp, unused
    let len = body.len();
    out.push(((len >> 16) & 0xFF) as u8);
    out.push(((len >> 8) & 0xFF) as u8);
    out.push((len & 0xFF) as u8);
    out.push(message_type);
    out.extend_from_slice(&stream_id.to_le_bytes());

    for (i, chunk) in body.chunks(CHUNK_BODY_SIZE).enumerate() {
        if i > 0 {
            out.push(CONTINUATION_MARKER);
        }
        out.extend_from_slice(chunk);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_wire::upstream_frame::{UpstreamFrameReader, MESSAGE_TYPE_AMF0};

    #[test]
    fn round_trips_through_the_dispatcher_side_reader() {
        let body: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
        let framed = encode_chunked_message(MESSAGE_TYPE_AMF0, 3, &body);

        let mut reader = UpstreamFrameReader::new();
        let messages = reader.feed(&framed);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MESSAGE_TYPE_AMF0);
        assert_eq!(messages[0].stream_id, 3);
        assert_eq!(messages[0].body, body);
    }

    #[test]
    fn short_body_needs_no_continuation_markers() {
        let body = vec![0xAB; 10];
        let framed = encode_chunked_message(MESSAGE_TYPE_AMF0, 1, &body);
        assert_eq!(framed.len(), 12 + 10);
    }
}
