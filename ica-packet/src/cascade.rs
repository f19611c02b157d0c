//! Builds the cascade `MsgRequestAction`: metadata, signature, price and expiration.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ibc_primitives::Signer;
use lumera_ica_packet_types::{ActionType, CascadeMetadata, MsgRequestAction, HOST_DENOM};
use rand::Rng;
use serde::Serialize;

use crate::client::ActionParams;
use crate::error::BuildError;
use crate::keyring::SigningIdentity;

/// Highest RaptorQ symbol identifier counter accepted by the host chain.
pub const RQ_IDS_MAX: u64 = 50;

/// Fee charged per action when the chain reports none.
pub const DEFAULT_BASE_ACTION_FEE: u128 = 10_000;

/// How long the host keeps the request open.
pub const EXPIRATION: Duration = Duration::from_secs(25 * 60 * 60);

/// A file to store on the host chain.
#[derive(Clone, Debug)]
pub struct CascadePayload {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl CascadePayload {
    pub fn new(file_name: String, data: Vec<u8>) -> Result<Self, BuildError> {
        if data.is_empty() {
            return Err(BuildError::EmptyFile { path: file_name });
        }
        Ok(Self { file_name, data })
    }

    /// Base64 BLAKE3 digest of the data.
    pub fn data_hash(&self) -> String {
        STANDARD.encode(blake3::hash(&self.data).as_bytes())
    }

    /// Size in started kilobytes, at least one.
    pub fn file_size_kbs(&self) -> u64 {
        (self.data.len() as u64).div_ceil(1024).max(1)
    }
}

/// Single-block description of how the payload is laid out for storage.
#[derive(Serialize)]
struct Layout {
    blocks: Vec<LayoutBlock>,
}

#[derive(Serialize)]
struct LayoutBlock {
    block_id: u32,
    original_offset: u64,
    size: u64,
    hash: String,
}

impl Layout {
    fn single_block(payload: &CascadePayload) -> Self {
        Self {
            blocks: vec![LayoutBlock {
                block_id: 0,
                original_offset: 0,
                size: payload.data.len() as u64,
                hash: payload.data_hash(),
            }],
        }
    }
}

/// Builds the metadata and signs its layout with `identity`.
pub fn cascade_metadata(
    identity: &SigningIdentity,
    payload: &CascadePayload,
    rq_ids_ic: u64,
) -> Result<CascadeMetadata, BuildError> {
    let layout = serde_json::to_vec(&Layout::single_block(payload))
        .map_err(|e| BuildError::Packet(e.into()))?;
    let layout_b64 = STANDARD.encode(layout);
    let signature = identity.sign(layout_b64.as_bytes())?;

    Ok(CascadeMetadata {
        data_hash: payload.data_hash(),
        file_name: payload.file_name.clone(),
        rq_ids_ic,
        rq_ids_max: RQ_IDS_MAX,
        rq_ids_ids: vec![],
        signatures: CascadeMetadata::join_signatures(&layout_b64, &signature),
        public: false,
    })
}

/// `base_action_fee + fee_per_kbyte * file_size_kbs`, as a coin string.
pub fn price(params: &ActionParams, file_size_kbs: u64) -> Result<String, BuildError> {
    let (base, denom) = match &params.base_action_fee {
        Some(coin) => (parse_amount(&coin.amount)?, coin.denom.clone()),
        None => (DEFAULT_BASE_ACTION_FEE, HOST_DENOM.to_string()),
    };
    let per_kb = match &params.fee_per_kbyte {
        Some(coin) => parse_amount(&coin.amount)?,
        None => 0,
    };

    let total = per_kb
        .checked_mul(u128::from(file_size_kbs))
        .and_then(|fee| fee.checked_add(base))
        .ok_or_else(|| BuildError::InvalidFee {
            value: format!("{per_kb} * {file_size_kbs} + {base}"),
        })?;

    Ok(format!("{total}{denom}"))
}

fn parse_amount(amount: &str) -> Result<u128, BuildError> {
    if amount.is_empty() {
        return Ok(0);
    }
    amount.parse().map_err(|_| BuildError::InvalidFee {
        value: amount.to_string(),
    })
}

/// First construction phase: the message as the local signer would send it
/// directly, with the signer as creator and no application key.
pub fn base_request_action(
    identity: &SigningIdentity,
    creator_prefix: &str,
    payload: &CascadePayload,
    params: &ActionParams,
    now_unix_secs: u64,
) -> Result<MsgRequestAction, BuildError> {
    let creator = identity.address(creator_prefix)?;
    let rq_ids_ic = rand::thread_rng().gen_range(1..=RQ_IDS_MAX);
    let file_size_kbs = payload.file_size_kbs();

    Ok(MsgRequestAction {
        creator: Signer::from(creator.to_string()),
        action_type: ActionType::Cascade,
        metadata: cascade_metadata(identity, payload, rq_ids_ic)?,
        price: price(params, file_size_kbs)?,
        expiration_time: now_unix_secs + EXPIRATION.as_secs(),
        file_size_kbs,
        app_pubkey: vec![],
    })
}
