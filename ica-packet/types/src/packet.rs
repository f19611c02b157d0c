//! Defines the interchain account packet data and its JSON wire form

use core::fmt::{Display, Error as FmtError, Formatter};
use core::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ibc_proto::ibc::applications::interchain_accounts::v1::{
    InterchainAccountPacketData as RawInterchainAccountPacketData, Type as RawType,
};
use ibc_proto::Protobuf;
use serde::{Deserialize, Serialize};

use crate::cosmos_tx::CosmosTx;
use crate::error::PacketError;

const MAX_MEMO_CHAR_LENGTH: usize = 256;

/// Defines the domain type for the interchain account packet data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JsonPacketData", into = "JsonPacketData")]
pub struct InterchainAccountPacketData {
    /// The type of the packet data.
    pub packet_type: ICAPacketType,
    /// The encoded `CosmosTx` to be executed on the host chain.
    pub data: Vec<u8>,
    /// The memo to be included in the transaction.
    pub memo: String,
}

impl InterchainAccountPacketData {
    pub fn new(data: Vec<u8>, memo: String) -> Result<Self, PacketError> {
        let packet = Self {
            packet_type: ICAPacketType::ExecuteTx,
            data,
            memo,
        };
        packet.validate()?;
        Ok(packet)
    }

    fn validate(&self) -> Result<(), PacketError> {
        if self.data.is_empty() {
            return Err(PacketError::EmptyPacketData);
        }
        let len = self.memo.chars().count();
        if len > MAX_MEMO_CHAR_LENGTH {
            return Err(PacketError::MemoTooLong { len });
        }
        Ok(())
    }

    /// Renders the packet as the single-line JSON the controller chain's
    /// `send-tx` command reads.
    pub fn to_json(&self) -> Result<String, PacketError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PacketError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decodes the `data` field back into the envelope it carries.
    pub fn decode_envelope(&self) -> Result<CosmosTx, PacketError> {
        CosmosTx::decode_vec(&self.data).map_err(|e| PacketError::DecodeProto {
            type_url: "/ibc.applications.interchain_accounts.v1.CosmosTx".to_string(),
            reason: e.to_string(),
        })
    }
}

impl From<CosmosTx> for InterchainAccountPacketData {
    fn from(tx: CosmosTx) -> Self {
        // a `CosmosTx` always holds at least one message, so the encoding is never empty
        Self {
            packet_type: ICAPacketType::ExecuteTx,
            data: tx.encode_vec(),
            memo: String::new(),
        }
    }
}

impl Protobuf<RawInterchainAccountPacketData> for InterchainAccountPacketData {}

impl TryFrom<RawInterchainAccountPacketData> for InterchainAccountPacketData {
    type Error = PacketError;

    fn try_from(raw: RawInterchainAccountPacketData) -> Result<Self, Self::Error> {
        let packet_type = match RawType::try_from(raw.r#type) {
            Ok(RawType::ExecuteTx) => ICAPacketType::ExecuteTx,
            _ => {
                return Err(PacketError::UnknownPacketType {
                    name: raw.r#type.to_string(),
                })
            }
        };

        let packet = Self {
            packet_type,
            data: raw.data,
            memo: raw.memo,
        };
        packet.validate()?;
        Ok(packet)
    }
}

impl From<InterchainAccountPacketData> for RawInterchainAccountPacketData {
    fn from(domain: InterchainAccountPacketData) -> Self {
        Self {
            r#type: RawType::from(domain.packet_type) as i32,
            data: domain.data,
            memo: domain.memo,
        }
    }
}

/// Defines a classification of message issued from a controller chain to its
/// associated interchain accounts host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ICAPacketType {
    /// Execute a transaction on an interchain accounts host chain
    ExecuteTx,
}

impl ICAPacketType {
    pub fn as_str(&self) -> &'static str {
        RawType::from(*self).as_str_name()
    }
}

impl From<ICAPacketType> for RawType {
    fn from(value: ICAPacketType) -> Self {
        match value {
            ICAPacketType::ExecuteTx => RawType::ExecuteTx,
        }
    }
}

impl Display for ICAPacketType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.as_str())
    }
}

impl FromStr for ICAPacketType {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match RawType::from_str_name(s) {
            Some(RawType::ExecuteTx) => Ok(Self::ExecuteTx),
            _ => Err(PacketError::UnknownPacketType {
                name: s.to_string(),
            }),
        }
    }
}

/// JSON form of the packet data: the type by name and the data as base64.
#[derive(Serialize, Deserialize)]
struct JsonPacketData {
    #[serde(rename = "type")]
    packet_type: String,
    data: String,
    #[serde(default)]
    memo: String,
}

impl TryFrom<JsonPacketData> for InterchainAccountPacketData {
    type Error = PacketError;

    fn try_from(json: JsonPacketData) -> Result<Self, Self::Error> {
        let packet = Self {
            packet_type: json.packet_type.parse()?,
            data: STANDARD.decode(json.data)?,
            memo: json.memo,
        };
        packet.validate()?;
        Ok(packet)
    }
}

impl From<InterchainAccountPacketData> for JsonPacketData {
    fn from(packet: InterchainAccountPacketData) -> Self {
        Self {
            packet_type: packet.packet_type.to_string(),
            data: STANDARD.encode(packet.data),
            memo: packet.memo,
        }
    }
}
