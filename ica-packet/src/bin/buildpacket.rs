//! Prints the ICS-27 packet JSON for a cascade request on stdout.
//!
//! ```text
//! buildpacket --mnemonic "..." --ica-address lumera1... --grpc-addr localhost:9090 \
//!     --chain-id lumera-testnet-2 --file /tmp/test.bin --owner-hrp osmo
//! ```
//!
//! Logs go to stderr, filtered by `RUST_LOG`.
use std::process::ExitCode;

use clap::Parser;
use lumera_ica_packet::builder::DEFAULT_OWNER_HRP;
use lumera_ica_packet::{build_packet, BuildError, BuildRequest};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "buildpacket", version, about)]
struct Cli {
    /// BIP-39 mnemonic the signing key is derived from.
    #[arg(long, default_value = "")]
    mnemonic: String,

    /// Interchain account address on the host chain.
    #[arg(long, default_value = "")]
    ica_address: String,

    /// Host chain gRPC address (host:port).
    #[arg(long, default_value = "")]
    grpc_addr: String,

    /// Host chain id.
    #[arg(long, default_value = "")]
    chain_id: String,

    /// Path to the file to create the action for.
    #[arg(long, default_value = "")]
    file: String,

    /// Bech32 prefix of the controller chain.
    #[arg(long, default_value = DEFAULT_OWNER_HRP)]
    owner_hrp: String,
}

impl From<Cli> for BuildRequest {
    fn from(cli: Cli) -> Self {
        Self {
            mnemonic: cli.mnemonic,
            ica_address: cli.ica_address,
            grpc_addr: cli.grpc_addr,
            chain_id: cli.chain_id,
            file: cli.file,
            owner_hrp: cli.owner_hrp,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<String, BuildError> {
    let packet = build_packet(&cli.into())?;
    Ok(packet.to_json()?)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // help and version go to stdout
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprint!("buildpacket: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing();

    // returning instead of exiting lets the keyring directory be removed
    match run(cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(kind = %e.kind(), "build failed");
            eprintln!("buildpacket: {e}");
            ExitCode::FAILURE
        }
    }
}
