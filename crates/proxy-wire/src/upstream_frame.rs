//! Reassembly of the upstream (game-server) chunked message framing (§4.8).
//!
//! Each logical message is split by the upstream server into a channel
//! header followed by up to 128 bytes of body, then a `0xC3` continuation
//! marker before every subsequent 128-byte body chunk. The header flavour is
//! selected by the top two bits of the first header byte: `00` is a full
//! 12-byte header (3-byte timestamp, 3-byte message length, 1-byte message
//! type, 4-byte stream id); `01` is an 8-byte header that reuses the stream
//! id of the most recently completed full header. Other top-bit
//! combinations are not produced by the upstream server in practice and are
//! ignored here (the reader resynchronises by dropping one byte).

/// A fully reassembled upstream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamMessage {
    pub message_type: u8,
    pub stream_id: u32,
    pub body: Vec<u8>,
}

/// Message type carrying AMF0 (with optional embedded AMF3) payloads.
pub const MESSAGE_TYPE_AMF0: u8 = 0x14;
/// Message type carrying pure AMF3 payloads.
pub const MESSAGE_TYPE_AMF3: u8 = 0x11;

const CHUNK_BODY_SIZE: usize = 128;
const CONTINUATION_MARKER: u8 = 0xC3;

struct PendingMessage {
    message_type: u8,
    stream_id: u32,
    total_len: usize,
    body: Vec<u8>,
}

/// Incremental reassembler: feed it raw bytes as they arrive on the socket,
/// get back zero or more complete [`UpstreamMessage`]s.
pub struct UpstreamFrameReader {
    buf: Vec<u8>,
    pending: Option<PendingMessage>,
    last_stream_id: u32,
}

impl Default for UpstreamFrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamFrameReader {
    pub fn new() -> Self {
        UpstreamFrameReader {
            buf: Vec::new(),
            pending: None,
            last_stream_id: 0,
        }
    }

    pub fn feed(&mut self, data: &[u8]) -> Vec<UpstreamMessage> {
        self.buf.extend_from_slice(data);
        let mut out = Vec::new();

        loop {
            if self.pending.is_none() {
                if self.buf.is_empty() {
                    break;
                }
                let fmt = self.buf[0] >> 6;
                match fmt {
                    0b00 => {
                        if self.buf.len() < 12 {
                            break;
                        }
                        let total_len = u24_be(&self.buf[4..7]);
                        let message_type = self.buf[7];
                        let stream_id = u32_le(&self.buf[8..12]);
                        self.buf.drain(0..12);
                        self.last_stream_id = stream_id;
                        self.pending = Some(PendingMessage {
                            message_type,
                            stream_id,
                            total_len,
                            body: Vec::with_capacity(total_len),
                        });
                    }
                    0b01 => {
                        if self.buf.len() < 8 {
                            break;
                        }
                        let total_len = u24_be(&self.buf[4..7]);
                        let message_type = self.buf[7];
                        let stream_id = self.last_stream_id;
                        self.buf.drain(0..8);
                        self.pending = Some(PendingMessage {
                            message_type,
                            stream_id,
                            total_len,
                            body: Vec::with_capacity(total_len),
                        });
                    }
                    _ => {
                        // Unsupported header flavour: resynchronise.
                        self.buf.remove(0);
                    }
                }
                continue;
            }

            let pending = self.pending.as_mut().expect("checked above");
            if pending.body.len() == pending.total_len {
                let done = self.pending.take().expect("checked above");
                out.push(UpstreamMessage {
                    message_type: done.message_type,
                    stream_id: done.stream_id,
                    body: done.body,
                });
                continue;
            }

            let remaining_total = pending.total_len - pending.body.len();
            let room_in_chunk = CHUNK_BODY_SIZE - (pending.body.len() % CHUNK_BODY_SIZE);
            let take = room_in_chunk.min(remaining_total).min(self.buf.len());
            if take == 0 {
                break;
            }
            pending.body.extend_from_slice(&self.buf[..take]);
            self.buf.drain(0..take);

            let at_chunk_boundary = pending.body.len() % CHUNK_BODY_SIZE == 0;
            let is_done = pending.body.len() == pending.total_len;
            if at_chunk_boundary && !is_done {
                if self.buf.is_empty() {
                    break;
                }
                if self.buf[0] == CONTINUATION_MARKER {
                    self.buf.remove(0);
                }
            }
        }

        out
    }
}

fn u24_be(bytes: &[u8]) -> usize {
    ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize)
}

fn u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
