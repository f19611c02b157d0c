//! Data structures of the interchain-account packet that asks the Lumera host
//! chain to register a cascade storage action.
//!
//! Naming follows the ICS-27 convention used across this workspace:
//! + "controller" is the chain that owns the interchain account (chain A)
//! + "host" is the chain the interchain account lives on (chain B)
#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    rust_2018_idioms
)]

pub mod action;
pub mod cosmos_tx;
pub mod error;
pub mod metadata;
pub mod packet;

pub use action::{ActionType, MsgRequestAction, RequestActionOverrides};
pub use cosmos_tx::CosmosTx;
pub use metadata::CascadeMetadata;
pub use packet::{ICAPacketType, InterchainAccountPacketData};

/// Re-exports the ICS-27 proto types from the `ibc-proto` crate.
pub mod proto {
    pub use ibc_proto::ibc::applications::interchain_accounts::v1 as interchain_accounts;

    pub use crate::action::RawMsgRequestAction;
}

/// Denomination the host chain charges action fees in.
pub const HOST_DENOM: &str = "ulume";

/// Port identifier prefix the controller chain binds interchain account
/// channels to.
pub const CONTROLLER_PORT_PREFIX: &str = "icacontroller-";
