//! Defines the error type of the submission driver
use displaydoc::Display;
use lumera_ica_packet_types::error::PacketError;

#[derive(Debug, Display)]
pub enum DriverError {
    /// failed to spawn `{command}`: {reason}
    Spawn { command: String, reason: String },
    /// `{command}` exited with {status}: {stderr}
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    /// chain rejected `{operation}` with code {code}: {raw_log}
    ChainRejected {
        operation: &'static str,
        code: u32,
        raw_log: String,
    },
    /// timed out after {elapsed_secs}s waiting for {what}
    Timeout { what: String, elapsed_secs: u64 },
    /// unexpected output of `{operation}`: {reason}
    Output {
        operation: &'static str,
        reason: String,
    },
    /// failed to compile `buildpacket`: {reason}
    Compile { reason: String },
    /// `buildpacket` failed: {stderr}
    Builder { stderr: String },
    /// invalid packet: {0}
    Packet(PacketError),
    /// packet creator is `{actual}`, expected the interchain account `{expected}`
    CreatorMismatch { expected: String, actual: String },
    /// no connection found on `{chain}`
    NoConnection { chain: String },
    /// no channel bound to a port starting with `{prefix}` on `{chain}`
    NoChannel { chain: String, prefix: String },
    /// invalid identifier `{value}`: {reason}
    Identifier { value: String, reason: String },
    /// interchain account `{address}` holds no `{denom}`
    Unfunded { address: String, denom: String },
    /// action `{action_id}` has type `{actual}`, expected `{expected}`
    UnexpectedActionType {
        action_id: String,
        expected: String,
        actual: String,
    },
    /// i/o error: {reason}
    Io { reason: String },
}

impl DriverError {
    /// True for errors raised because a bounded wait ran out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            Self::Packet(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PacketError> for DriverError {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}
