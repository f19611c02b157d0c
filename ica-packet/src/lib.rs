//! Builds the ICS-27 packet through which an interchain account asks the
//! Lumera host chain to register a cascade storage action.
//!
//! The pipeline derives a signing key from a mnemonic, queries the host over
//! gRPC for its chain id and action fees, signs the cascade metadata of a
//! file, and wraps the resulting `MsgRequestAction`, with the interchain
//! account as creator, in a single-message `CosmosTx` packet.
#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    rust_2018_idioms
)]

pub mod builder;
pub mod cascade;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod keyring;

pub use builder::{assemble_packet, build_packet, BuildRequest};
pub use client::{ChainQuerier, GrpcQuerier};
pub use error::{BuildError, ErrorKind};
pub use keyring::{EphemeralKeyring, SigningIdentity};

/// Re-exports the packet domain types.
pub mod types {
    #[doc(inline)]
    pub use lumera_ica_packet_types::*;
}
