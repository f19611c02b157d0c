//! Defines the packet error type
use displaydoc::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// envelope must carry at least one message
    EmptyEnvelope,
    /// packet data cannot be empty
    EmptyPacketData,
    /// packet memo has `{len}` characters, at most 256 are allowed
    MemoTooLong { len: usize },
    /// unknown packet type `{name}`, expected `TYPE_EXECUTE_TX`
    UnknownPacketType { name: String },
    /// invalid base64 packet data: `{reason}`
    InvalidBase64 { reason: String },
    /// failed to decode `{type_url}`: `{reason}`
    DecodeProto { type_url: String, reason: String },
    /// unexpected type url `{actual}`, expected `{expected}`
    UnexpectedTypeUrl { expected: String, actual: String },
    /// missing field `{0}`
    MissingField(&'static str),
    /// unsupported action type `{0}`
    UnsupportedActionType(String),
    /// invalid `{field}` value `{value}`
    InvalidNumber { field: &'static str, value: String },
    /// invalid cascade metadata: `{reason}`
    InvalidMetadata { reason: String },
    /// invalid packet json: `{reason}`
    Json { reason: String },
}

impl std::error::Error for PacketError {}

impl From<serde_json::Error> for PacketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            reason: err.to_string(),
        }
    }
}

impl From<base64::DecodeError> for PacketError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidBase64 {
            reason: err.to_string(),
        }
    }
}
