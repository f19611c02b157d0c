//! Contains the `CascadeMetadata` carried as JSON inside a cascade `MsgRequestAction`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::PacketError;

/// Separator between the encoded layout and its signature in
/// [`CascadeMetadata::signatures`].
const SIGNATURE_SEPARATOR: char = '.';

/// Describes the payload a cascade action asks the host chain to store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeMetadata {
    /// Base64 BLAKE3 digest of the file bytes.
    pub data_hash: String,
    pub file_name: String,
    /// Initial counter of the RaptorQ symbol identifiers.
    pub rq_ids_ic: u64,
    pub rq_ids_max: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rq_ids_ids: Vec<String>,
    /// `base64(layout) + "." + base64(signature)`, the signature being made
    /// over the base64 layout string.
    pub signatures: String,
    #[serde(default)]
    pub public: bool,
}

impl CascadeMetadata {
    /// Joins an encoded layout and its signature into the `signatures` field format.
    pub fn join_signatures(layout_b64: &str, signature: &[u8]) -> String {
        format!(
            "{layout_b64}{SIGNATURE_SEPARATOR}{}",
            STANDARD.encode(signature)
        )
    }

    /// Splits `signatures` back into the base64 layout and the raw signature bytes.
    pub fn split_signatures(&self) -> Result<(&str, Vec<u8>), PacketError> {
        let (layout_b64, signature_b64) = self
            .signatures
            .split_once(SIGNATURE_SEPARATOR)
            .ok_or_else(|| PacketError::InvalidMetadata {
                reason: "signatures must be `<layout>.<signature>`".to_string(),
            })?;

        if layout_b64.is_empty() || signature_b64.is_empty() {
            return Err(PacketError::InvalidMetadata {
                reason: "signatures has an empty layout or signature".to_string(),
            });
        }

        // the layout is only checked for being valid base64
        STANDARD.decode(layout_b64)?;

        Ok((layout_b64, STANDARD.decode(signature_b64)?))
    }

    pub fn validate(&self) -> Result<(), PacketError> {
        if self.data_hash.is_empty() {
            return Err(PacketError::InvalidMetadata {
                reason: "data_hash cannot be empty".to_string(),
            });
        }
        if self.file_name.is_empty() {
            return Err(PacketError::InvalidMetadata {
                reason: "file_name cannot be empty".to_string(),
            });
        }
        if self.rq_ids_max == 0 {
            return Err(PacketError::InvalidMetadata {
                reason: "rq_ids_max must be positive".to_string(),
            });
        }
        self.split_signatures().map(|_| ())
    }

    pub fn to_json(&self) -> Result<String, PacketError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PacketError> {
        let metadata: Self = serde_json::from_str(json).map_err(|e| PacketError::InvalidMetadata {
            reason: e.to_string(),
        })?;
        metadata.validate()?;
        Ok(metadata)
    }
}
