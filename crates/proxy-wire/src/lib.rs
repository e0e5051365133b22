//! Wire formats for the dispatcher↔worker link and the upstream RTMP-style
//! chunk framing.
//!
//! This crate is intentionally free of I/O and async runtime dependencies —
//! it only encodes/decodes byte buffers. Connection state machines that use
//! these types (buffering across read boundaries, socket writes) live in the
//! service crates.

pub mod handshake;
pub mod request_record;
pub mod result_record;
pub mod upstream_frame;

pub use handshake::{WORKER_HANDSHAKE_MAGIC, WORKER_READY_BYTE};
pub use request_record::{GenericElement, RequestKind, RequestPayload, RequestRecord};
pub use result_record::{ResultHeader, encode_result_record};
pub use upstream_frame::{UpstreamFrameReader, UpstreamMessage};

/// Records larger than this are rejected by the encoder (§4.6: "the maximum
/// single request size is bounded").
pub const MAX_RECORD_SIZE: usize = 1024;

/// Writes to the worker socket are chunked at this many bytes per emission.
pub const WRITE_CHUNK_SIZE: usize = 1408;
