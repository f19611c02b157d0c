//! Defines the error type of the packet builder
use displaydoc::Display;
use lumera_ica_packet_types::error::PacketError;

#[derive(Debug, Display)]
pub enum BuildError {
    /// --{flag} is required
    MissingFlag { flag: &'static str },
    /// invalid ICA address `{address}`: {reason}
    InvalidIcaAddress { address: String, reason: String },
    /// invalid gRPC endpoint `{endpoint}`: {reason}
    InvalidEndpoint { endpoint: String, reason: String },
    /// import key from mnemonic: {reason}
    InvalidMnemonic { reason: String },
    /// key derivation failed: {reason}
    KeyDerivation { reason: String },
    /// signing failed: {reason}
    Signing { reason: String },
    /// keyring: {reason}
    Keyring { reason: String },
    /// failed to connect to gRPC endpoint `{endpoint}`: {reason}
    Connect { endpoint: String, reason: String },
    /// query `{query}` failed: {reason}
    Query { query: &'static str, reason: String },
    /// chain id mismatch: expected `{expected}`, node reports `{actual}`
    ChainIdMismatch { expected: String, actual: String },
    /// invalid fee `{value}` reported by the chain
    InvalidFee { value: String },
    /// read file `{path}`: {reason}
    ReadFile { path: String, reason: String },
    /// file `{path}` is empty
    EmptyFile { path: String },
    /// async runtime: {reason}
    Runtime { reason: String },
    /// encode packet: {0}
    Packet(PacketError),
}

/// Coarse classification of a [`BuildError`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ErrorKind {
    /// validation
    Validation,
    /// key derivation
    KeyDerivation,
    /// connectivity
    Connectivity,
    /// chain query
    ChainQuery,
    /// payload
    Payload,
    /// encoding
    Encoding,
    /// io
    Io,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFlag { .. }
            | Self::InvalidIcaAddress { .. }
            | Self::InvalidEndpoint { .. } => ErrorKind::Validation,
            Self::InvalidMnemonic { .. } | Self::KeyDerivation { .. } | Self::Signing { .. } => {
                ErrorKind::KeyDerivation
            }
            Self::Connect { .. } => ErrorKind::Connectivity,
            Self::Query { .. } | Self::ChainIdMismatch { .. } | Self::InvalidFee { .. } => {
                ErrorKind::ChainQuery
            }
            Self::EmptyFile { .. } => ErrorKind::Payload,
            Self::Packet(_) => ErrorKind::Encoding,
            Self::Keyring { .. } | Self::ReadFile { .. } | Self::Runtime { .. } => ErrorKind::Io,
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            Self::Packet(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PacketError> for BuildError {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}
