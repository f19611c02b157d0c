//! The packet building pipeline behind the `buildpacket` binary.

use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use cosmrs::AccountId;
use lumera_ica_packet_types::{CosmosTx, InterchainAccountPacketData, RequestActionOverrides};

use crate::cascade::{base_request_action, CascadePayload};
use crate::client::{ChainQuerier, GrpcQuerier};
use crate::endpoint::normalize_endpoint;
use crate::error::BuildError;
use crate::keyring::{EphemeralKeyring, SigningIdentity, KEY_NAME};

pub const DEFAULT_OWNER_HRP: &str = "osmo";

/// Inputs of one builder invocation, as given on the command line.
#[derive(Clone, Debug, Default)]
pub struct BuildRequest {
    pub mnemonic: String,
    pub ica_address: String,
    pub grpc_addr: String,
    pub chain_id: String,
    pub file: String,
    pub owner_hrp: String,
}

impl BuildRequest {
    /// Checks the required inputs are present, in flag order.
    pub fn validate(&self) -> Result<(), BuildError> {
        for (flag, value) in [
            ("mnemonic", &self.mnemonic),
            ("ica-address", &self.ica_address),
            ("grpc-addr", &self.grpc_addr),
            ("chain-id", &self.chain_id),
            ("file", &self.file),
        ] {
            if value.trim().is_empty() {
                return Err(BuildError::MissingFlag { flag });
            }
        }
        Ok(())
    }

    fn owner_hrp(&self) -> &str {
        match self.owner_hrp.trim() {
            "" => DEFAULT_OWNER_HRP,
            hrp => hrp,
        }
    }
}

/// Parses the ICA address; its bech32 prefix is the host chain prefix.
pub fn parse_ica_address(address: &str) -> Result<AccountId, BuildError> {
    AccountId::from_str(address.trim()).map_err(|e| BuildError::InvalidIcaAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Runs the whole pipeline against the live host chain.
pub fn build_packet(request: &BuildRequest) -> Result<InterchainAccountPacketData, BuildError> {
    request.validate()?;

    let ica_address = parse_ica_address(&request.ica_address)?;
    let host_prefix = ica_address.prefix();

    let keyring = EphemeralKeyring::new()?;
    let record = keyring.import(
        KEY_NAME,
        &SigningIdentity::from_mnemonic(&request.mnemonic)?,
        host_prefix,
    )?;
    let identity = keyring.signer(KEY_NAME)?;
    tracing::info!(address = %record.address, "derived host address");

    let owner = identity.address(request.owner_hrp())?;
    tracing::info!(%owner, "derived controller owner address");

    let endpoint = normalize_endpoint(&request.grpc_addr);
    tracing::info!(%endpoint, "connecting to host gRPC");
    let mut querier = GrpcQuerier::connect(&endpoint)?;

    assemble_packet(
        &mut querier,
        &identity,
        &ica_address,
        request.chain_id.trim(),
        Path::new(request.file.trim()),
        unix_now()?,
    )
}

/// Queries the chain, builds the request action for `file` and wraps it into
/// the packet executed by `ica_address`.
pub fn assemble_packet<Q: ChainQuerier>(
    querier: &mut Q,
    identity: &SigningIdentity,
    ica_address: &AccountId,
    chain_id: &str,
    file: &Path,
    now_unix_secs: u64,
) -> Result<InterchainAccountPacketData, BuildError> {
    let node = querier.node_info()?;
    if node.network != chain_id {
        return Err(BuildError::ChainIdMismatch {
            expected: chain_id.to_string(),
            actual: node.network,
        });
    }
    tracing::debug!(moniker = %node.moniker, version = %node.app_version, "host node");

    match querier.account(ica_address.as_ref())? {
        Some(account) => tracing::info!(
            address = %account.address,
            account_number = account.account_number,
            sequence = account.sequence,
            "found ICA account on host"
        ),
        None => tracing::warn!(address = %ica_address, "ICA account not found on host"),
    }

    let params = querier.action_params()?;
    let payload = read_payload(file)?;

    let base = base_request_action(identity, ica_address.prefix(), &payload, &params, now_unix_secs)?;
    let msg = base.with_overrides(RequestActionOverrides {
        creator: ica_address.to_string().into(),
        app_pubkey: identity.public_key_bytes(),
    });
    tracing::info!(
        creator = %msg.creator.as_ref(),
        action_type = %msg.action_type,
        price = %msg.price,
        "built MsgRequestAction"
    );

    Ok(InterchainAccountPacketData::from(CosmosTx::single(msg)))
}

fn read_payload(file: &Path) -> Result<CascadePayload, BuildError> {
    let path = file.display().to_string();
    let data = std::fs::read(file).map_err(|e| BuildError::ReadFile {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());

    if data.is_empty() {
        return Err(BuildError::EmptyFile { path });
    }
    CascadePayload::new(file_name, data)
}

fn unix_now() -> Result<u64, BuildError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| BuildError::Runtime {
            reason: e.to_string(),
        })
}
