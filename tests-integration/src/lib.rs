//! Drives an interchain account from the Osmosis controller chain to the
//! Lumera host chain and checks that the cascade action it submits is
//! created on the host under the interchain account.
//!
//! The chain daemons and the `rly` relayer are treated as black boxes: every
//! interaction goes through their command line interfaces, behind the
//! [`Exec`](exec::Exec) seam, and their JSON output is polled with bounded
//! waits.
#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    rust_2018_idioms
)]

pub mod chain;
pub mod config;
pub mod error;
pub mod exec;
pub mod flow;
pub mod relayer;
pub mod tool;
pub mod wait;

#[cfg(test)]
mod scripted;

pub use chain::CosmosChain;
pub use error::DriverError;
pub use flow::{FlowError, FlowReport, FlowStage, IcaFlow};
pub use relayer::Relayer;
