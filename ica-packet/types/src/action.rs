//! Defines the `MsgRequestAction` message of the Lumera action module.

use core::fmt::{Display, Error as FmtError, Formatter};
use core::str::FromStr;

use ibc_primitives::Signer;
use ibc_proto::google::protobuf::Any;
use ibc_proto::Protobuf;
use prost::Name;

use crate::error::PacketError;
use crate::metadata::CascadeMetadata;

/// Raw `lumera.action.v1.MsgRequestAction`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMsgRequestAction {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub action_type: String,
    /// JSON encoded metadata of the action type.
    #[prost(string, tag = "3")]
    pub metadata: String,
    /// Coin string, e.g. `10000ulume`.
    #[prost(string, tag = "4")]
    pub price: String,
    /// Unix timestamp in seconds.
    #[prost(string, tag = "5")]
    pub expiration_time: String,
    #[prost(string, tag = "6")]
    pub file_size_kbs: String,
    #[prost(bytes = "vec", tag = "7")]
    pub app_pubkey: Vec<u8>,
}

impl Name for RawMsgRequestAction {
    const NAME: &'static str = "MsgRequestAction";
    const PACKAGE: &'static str = "lumera.action.v1";
}

/// Kind of action a `MsgRequestAction` asks the host chain to register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    Sense,
    Cascade,
}

impl ActionType {
    /// String value of the enum as the host chain renders it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sense => "ACTION_TYPE_SENSE",
            Self::Cascade => "ACTION_TYPE_CASCADE",
        }
    }
}

impl Display for ActionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTION_TYPE_SENSE" | "SENSE" => Ok(Self::Sense),
            "ACTION_TYPE_CASCADE" | "CASCADE" => Ok(Self::Cascade),
            other => Err(PacketError::UnsupportedActionType(other.to_string())),
        }
    }
}

/// Domain type of a cascade storage request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgRequestAction {
    pub creator: Signer,
    pub action_type: ActionType,
    pub metadata: CascadeMetadata,
    pub price: String,
    pub expiration_time: u64,
    pub file_size_kbs: u64,
    pub app_pubkey: Vec<u8>,
}

impl MsgRequestAction {
    pub fn type_url() -> String {
        RawMsgRequestAction::type_url()
    }

    /// Packs the message into an `Any` for inclusion in a `CosmosTx`.
    pub fn to_any(self) -> Any {
        Any {
            type_url: Self::type_url(),
            value: self.encode_vec(),
        }
    }

    /// Unpacks a message from an `Any`, checking its type url.
    pub fn from_any(any: &Any) -> Result<Self, PacketError> {
        let expected = Self::type_url();
        if any.type_url != expected {
            return Err(PacketError::UnexpectedTypeUrl {
                expected,
                actual: any.type_url.clone(),
            });
        }

        Self::decode_vec(&any.value).map_err(|e| PacketError::DecodeProto {
            type_url: any.type_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Second construction phase: replaces the fields the base constructor
    /// fills from the local signing identity.
    pub fn with_overrides(self, overrides: RequestActionOverrides) -> Self {
        Self {
            creator: overrides.creator,
            app_pubkey: overrides.app_pubkey,
            ..self
        }
    }
}

/// Fields that must differ from what the base message constructor produces
/// when the message is executed through an interchain account.
///
/// The constructor signs the metadata with the local key and therefore fills
/// `creator` with the local address. On the host chain the message runs under
/// the interchain account, so `creator` must be the ICA address, and since the
/// ICA has no public key of its own the signer's key travels in `app_pubkey`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestActionOverrides {
    pub creator: Signer,
    pub app_pubkey: Vec<u8>,
}

impl Protobuf<RawMsgRequestAction> for MsgRequestAction {}

impl TryFrom<RawMsgRequestAction> for MsgRequestAction {
    type Error = PacketError;

    fn try_from(raw: RawMsgRequestAction) -> Result<Self, Self::Error> {
        if raw.creator.is_empty() {
            return Err(PacketError::MissingField("creator"));
        }

        let action_type = raw.action_type.parse()?;
        if action_type != ActionType::Cascade {
            return Err(PacketError::UnsupportedActionType(raw.action_type));
        }

        let expiration_time =
            raw.expiration_time
                .parse()
                .map_err(|_| PacketError::InvalidNumber {
                    field: "expiration_time",
                    value: raw.expiration_time.clone(),
                })?;

        let file_size_kbs = raw
            .file_size_kbs
            .parse()
            .map_err(|_| PacketError::InvalidNumber {
                field: "file_size_kbs",
                value: raw.file_size_kbs.clone(),
            })?;

        Ok(Self {
            creator: raw.creator.into(),
            action_type,
            metadata: CascadeMetadata::from_json(&raw.metadata)?,
            price: raw.price,
            expiration_time,
            file_size_kbs,
            app_pubkey: raw.app_pubkey,
        })
    }
}

impl From<MsgRequestAction> for RawMsgRequestAction {
    fn from(domain: MsgRequestAction) -> Self {
        Self {
            creator: domain.creator.as_ref().to_string(),
            action_type: domain.action_type.to_string(),
            metadata: serde_json::to_string(&domain.metadata)
                .expect("CascadeMetadata's infallible Serialize impl failed"),
            price: domain.price,
            expiration_time: domain.expiration_time.to_string(),
            file_size_kbs: domain.file_size_kbs.to_string(),
            app_pubkey: domain.app_pubkey,
        }
    }
}
