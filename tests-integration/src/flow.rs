//! The interchain account flow: register, fund, submit, relay and verify.

use core::fmt::{Display, Error as FmtError, Formatter};
use std::path::Path;
use std::time::Duration;

use ibc_core_host_types::identifiers::{ChannelId, ConnectionId};
use lumera_ica_packet_types::{ActionType, InterchainAccountPacketData};

use crate::chain::{ActionRecord, CosmosChain};
use crate::error::DriverError;
use crate::exec::Exec;
use crate::relayer::Relayer;
use crate::tool::{PacketRequest, PacketSource};
use crate::wait::{poll_until, wait_for_blocks, HeightSource, PollConfig};

/// File name the packet is stored under in the controller node's home.
pub const PACKET_FILE_NAME: &str = "ica_packet.json";

/// Stages of the flow, in the order they are reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlowStage {
    Unregistered,
    Registering,
    Registered,
    AddressKnown,
    Funded,
    PacketBuilt,
    Submitted,
    Executed,
    Relayed,
    Verified,
}

impl Display for FlowStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let name = match self {
            Self::Unregistered => "unregistered",
            Self::Registering => "registering",
            Self::Registered => "registered",
            Self::AddressKnown => "address known",
            Self::Funded => "funded",
            Self::PacketBuilt => "packet built",
            Self::Submitted => "submitted",
            Self::Executed => "executed",
            Self::Relayed => "relayed",
            Self::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// A failed flow, with the stage it was in when the failing step ran.
#[derive(Debug)]
pub struct FlowError {
    pub stage: FlowStage,
    pub source: DriverError,
}

impl Display for FlowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "interchain account flow failed at stage `{}`: {}", self.stage, self.source)
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Block counts and poll bounds of the flow.
#[derive(Clone, Copy, Debug)]
pub struct FlowTimings {
    /// Blocks to wait for the channel handshake after registering.
    pub handshake_blocks: u64,
    pub funding_blocks: u64,
    pub inclusion_blocks: u64,
    pub relay_blocks: u64,
    pub flush_blocks: u64,
    pub blocks: PollConfig,
    pub address: PollConfig,
    pub action: PollConfig,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            handshake_blocks: 15,
            funding_blocks: 3,
            inclusion_blocks: 3,
            relay_blocks: 10,
            flush_blocks: 5,
            blocks: PollConfig::new(Duration::from_secs(180), Duration::from_secs(1)),
            address: PollConfig::new(Duration::from_secs(120), Duration::from_secs(2)),
            action: PollConfig::new(Duration::from_secs(60), Duration::from_secs(2)),
        }
    }
}

/// Who drives the flow and what it submits.
#[derive(Clone, Debug)]
pub struct FlowParams<'a> {
    /// Key of the interchain account owner in the controller keyring.
    pub owner_key: &'a str,
    pub owner_address: &'a str,
    /// Mnemonic of the owner key, handed to the packet builder.
    pub mnemonic: &'a str,
    pub connection_id: ConnectionId,
    /// Funded key in the host keyring.
    pub host_funder_key: &'a str,
    /// Coin sent to the interchain account.
    pub funding: &'a str,
    /// Host gRPC address reachable from the packet builder.
    pub host_grpc_addr: &'a str,
    pub payload: &'a Path,
}

/// What a successful flow observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowReport {
    pub ica_address: String,
    pub packet: InterchainAccountPacketData,
    pub txhash: String,
    pub channel_id: ChannelId,
    pub action: ActionRecord,
}

pub struct IcaFlow<'a, C, H, R, P> {
    controller: &'a CosmosChain<C>,
    host: &'a CosmosChain<H>,
    relayer: &'a Relayer<R>,
    packets: &'a P,
    params: FlowParams<'a>,
    timings: FlowTimings,
    stage: FlowStage,
}

impl<'a, C, H, R, P> IcaFlow<'a, C, H, R, P>
where
    C: Exec,
    H: Exec,
    R: Exec,
    P: PacketSource,
{
    pub fn new(
        controller: &'a CosmosChain<C>,
        host: &'a CosmosChain<H>,
        relayer: &'a Relayer<R>,
        packets: &'a P,
        params: FlowParams<'a>,
    ) -> Self {
        Self {
            controller,
            host,
            relayer,
            packets,
            params,
            timings: FlowTimings::default(),
            stage: FlowStage::Unregistered,
        }
    }

    pub fn with_timings(mut self, timings: FlowTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    fn advance(&mut self, stage: FlowStage) {
        tracing::info!(from = %self.stage, to = %stage, "flow stage");
        self.stage = stage;
    }

    fn fail(&self, source: DriverError) -> FlowError {
        tracing::error!(stage = %self.stage, error = %source, "flow failed");
        FlowError {
            stage: self.stage,
            source,
        }
    }

    /// Runs the flow to [`FlowStage::Verified`], stopping at the first failure.
    pub fn run(mut self) -> Result<FlowReport, FlowError> {
        self.advance(FlowStage::Registering);
        self.register().map_err(|e| self.fail(e))?;
        self.advance(FlowStage::Registered);

        let ica_address = self.ica_address().map_err(|e| self.fail(e))?;
        self.advance(FlowStage::AddressKnown);

        self.fund(&ica_address).map_err(|e| self.fail(e))?;
        self.advance(FlowStage::Funded);

        let (json, packet) = self.build_packet(&ica_address).map_err(|e| self.fail(e))?;
        self.advance(FlowStage::PacketBuilt);

        let txhash = self.submit(&json).map_err(|e| self.fail(e))?;
        self.advance(FlowStage::Submitted);

        self.check_execution(&txhash).map_err(|e| self.fail(e))?;
        self.advance(FlowStage::Executed);

        let channel_id = self.relay().map_err(|e| self.fail(e))?;
        self.advance(FlowStage::Relayed);

        let action = self.verify(&ica_address).map_err(|e| self.fail(e))?;
        self.advance(FlowStage::Verified);

        Ok(FlowReport {
            ica_address,
            packet,
            txhash,
            channel_id,
            action,
        })
    }

    fn both_chains(&self) -> [&dyn HeightSource; 2] {
        [self.controller, self.host]
    }

    fn register(&self) -> Result<(), DriverError> {
        self.controller
            .register_ica(self.params.owner_key, &self.params.connection_id)?
            .ensure_success("register interchain account")?;

        // the relayer completes the channel handshake in the background
        wait_for_blocks(
            self.timings.handshake_blocks,
            &self.both_chains(),
            self.timings.blocks,
        )
    }

    fn ica_address(&self) -> Result<String, DriverError> {
        let address = poll_until("interchain account address", self.timings.address, || {
            self.controller
                .query_ica_address(self.params.owner_address, &self.params.connection_id)
        })?;
        tracing::info!(%address, "interchain account address on host");
        Ok(address)
    }

    fn fund(&self, ica_address: &str) -> Result<(), DriverError> {
        self.host
            .bank_send(self.params.host_funder_key, ica_address, self.params.funding)?
            .ensure_success("fund interchain account")?;
        let host: &dyn HeightSource = self.host;
        wait_for_blocks(self.timings.funding_blocks, &[host], self.timings.blocks)?;

        let denom = &self.host.config().denom;
        let balance = self.host.balance(ica_address, denom)?;
        if balance == 0 {
            return Err(DriverError::Unfunded {
                address: ica_address.to_string(),
                denom: denom.clone(),
            });
        }
        tracing::info!(balance, %denom, "interchain account funded");
        Ok(())
    }

    /// Builds the packet and checks it runs under the interchain account.
    fn build_packet(
        &self,
        ica_address: &str,
    ) -> Result<(Vec<u8>, InterchainAccountPacketData), DriverError> {
        let request = PacketRequest {
            mnemonic: self.params.mnemonic,
            ica_address,
            grpc_addr: self.params.host_grpc_addr,
            chain_id: &self.host.config().chain_id,
            file: self.params.payload,
            owner_hrp: &self.controller.config().bech32_prefix,
        };
        let json = self.packets.build_packet(&request)?;

        let packet = InterchainAccountPacketData::from_json(String::from_utf8_lossy(&json).trim())?;
        let actions = packet.decode_envelope()?.request_actions()?;
        let [action] = actions.as_slice() else {
            return Err(DriverError::Output {
                operation: "buildpacket",
                reason: format!("expected one message, found {}", actions.len()),
            });
        };
        if action.creator.as_ref() != ica_address {
            return Err(DriverError::CreatorMismatch {
                expected: ica_address.to_string(),
                actual: action.creator.as_ref().to_string(),
            });
        }

        Ok((json, packet))
    }

    fn submit(&self, json: &[u8]) -> Result<String, DriverError> {
        let path = self.controller.write_file(PACKET_FILE_NAME, json)?;
        let response = self
            .controller
            .send_ica_tx(self.params.owner_key, &self.params.connection_id, &path)?
            .ensure_success("send interchain account tx")?;
        Ok(response.txhash)
    }

    fn check_execution(&self, txhash: &str) -> Result<(), DriverError> {
        let controller: &dyn HeightSource = self.controller;
        wait_for_blocks(self.timings.inclusion_blocks, &[controller], self.timings.blocks)?;
        self.controller
            .query_tx(txhash)?
            .ensure_success("execute interchain account tx")?;
        Ok(())
    }

    fn relay(&self) -> Result<ChannelId, DriverError> {
        wait_for_blocks(
            self.timings.relay_blocks,
            &self.both_chains(),
            self.timings.blocks,
        )?;

        let channel = self.relayer.ica_channel(&self.controller.config().chain_id)?;
        self.relayer.flush(&channel.channel_id)?;

        wait_for_blocks(
            self.timings.flush_blocks,
            &self.both_chains(),
            self.timings.blocks,
        )?;
        Ok(channel.channel_id)
    }

    /// Exactly one action created by `ica_address` must appear on the host.
    fn verify(&self, ica_address: &str) -> Result<ActionRecord, DriverError> {
        let mut created = poll_until(
            &format!("action created by {ica_address}"),
            self.timings.action,
            || {
                let actions = self.host.list_actions()?;
                tracing::debug!(count = actions.len(), "listed actions");
                let created: Vec<_> = actions
                    .into_iter()
                    .filter(|a| a.creator == ica_address)
                    .collect();
                Ok((!created.is_empty()).then_some(created))
            },
        )?;

        if created.len() != 1 {
            return Err(DriverError::Output {
                operation: "list actions",
                reason: format!(
                    "expected one action by {ica_address}, found {}",
                    created.len()
                ),
            });
        }
        let action = created.remove(0);

        let expected = ActionType::Cascade.as_str();
        if action.action_type != expected {
            return Err(DriverError::UnexpectedActionType {
                action_id: action.action_id,
                expected: expected.to_string(),
                actual: action.action_type,
            });
        }
        tracing::info!(action_id = %action.action_id, state = %action.state, "action created");
        Ok(action)
    }
}
