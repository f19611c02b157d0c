//! Defines the `CosmosTx` envelope, which carries a list of messages to the host chain

use ibc_proto::google::protobuf::Any;
use ibc_proto::ibc::applications::interchain_accounts::v1::CosmosTx as RawCosmosTx;
use ibc_proto::Protobuf;

use crate::action::MsgRequestAction;
use crate::error::PacketError;

#[derive(Clone, Debug, PartialEq)]
pub struct CosmosTx {
    /// The messages to be executed atomically on the host chain, in order.
    messages: Vec<Any>,
}

impl CosmosTx {
    pub fn new(messages: Vec<Any>) -> Result<Self, PacketError> {
        if messages.is_empty() {
            return Err(PacketError::EmptyEnvelope);
        }
        Ok(Self { messages })
    }

    /// Wraps exactly one request-action message.
    pub fn single(msg: MsgRequestAction) -> Self {
        Self {
            messages: vec![msg.to_any()],
        }
    }

    pub fn messages(&self) -> &[Any] {
        &self.messages
    }

    /// Decodes every message as a `MsgRequestAction`.
    pub fn request_actions(&self) -> Result<Vec<MsgRequestAction>, PacketError> {
        self.messages.iter().map(MsgRequestAction::from_any).collect()
    }
}

impl Protobuf<RawCosmosTx> for CosmosTx {}

impl TryFrom<RawCosmosTx> for CosmosTx {
    type Error = PacketError;

    fn try_from(raw: RawCosmosTx) -> Result<Self, Self::Error> {
        Self::new(raw.messages)
    }
}

impl From<CosmosTx> for RawCosmosTx {
    fn from(value: CosmosTx) -> Self {
        RawCosmosTx {
            messages: value.messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_envelope_is_rejected() {
        assert_eq!(CosmosTx::new(vec![]), Err(PacketError::EmptyEnvelope));
        assert!(CosmosTx::decode_vec(&[]).is_err());
    }

    #[test]
    fn test_single_message_envelope() {
        let msg = MsgRequestAction::new_dummy();
        let tx = CosmosTx::single(msg.clone());

        let decoded = CosmosTx::decode_vec(&tx.clone().encode_vec()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.messages().len(), 1);
        assert_eq!(decoded.request_actions().unwrap(), vec![msg]);
    }
}
