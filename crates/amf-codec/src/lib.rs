//! AMF0/AMF3 decode (to JSON) and the partial encoder needed to build
//! outbound invocations (§4.9), plus the RTMP chunk-framing wrapper used to
//! address messages to the upstream server.

pub mod amf0;
pub mod amf3;
pub mod encode;
pub mod rtmp_chunk;

use std::fmt;

pub use amf0::decode_amf0_message;
pub use amf3::decode_amf3_message;

/// Per-message decode state: the three reference tables described in §4.9,
/// scoped to a single top-level decode call and dropped at its end.
#[derive(Default)]
pub struct Decoder {
    pub(crate) strings: Vec<String>,
    pub(crate) objects: Vec<serde_json::Value>,
    pub(crate) traits: Vec<ClassTrait>,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTrait {
    pub class_name: String,
    pub externalizable: bool,
    pub dynamic: bool,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmfError {
    Truncated,
    InvalidMarker(u8),
    InvalidUtf8,
    BackReferenceOutOfRange,
    UnknownExternalizableClass(String),
}

impl fmt::Display for AmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfError::Truncated => write!(f, "truncated AMF buffer"),
            AmfError::InvalidMarker(m) => write!(f, "invalid AMF type marker 0x{m:02x}"),
            AmfError::InvalidUtf8 => write!(f, "AMF string is not valid UTF-8"),
            AmfError::BackReferenceOutOfRange => write!(f, "AMF reference index out of range"),
            AmfError::UnknownExternalizableClass(name) => {
                write!(f, "unknown externalizable class '{name}'")
            }
        }
    }
}

impl std::error::Error for AmfError {}
