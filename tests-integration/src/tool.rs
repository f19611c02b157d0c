//! The `buildpacket` binary, compiled once per test process.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use escargot::CargoBuild;
use once_cell::sync::OnceCell;

use crate::error::DriverError;

pub const BUILDPACKET_PACKAGE: &str = "lumera-ica-packet";
pub const BUILDPACKET_BIN: &str = "buildpacket";

static BUILDPACKET: OnceCell<BuildpacketTool> = OnceCell::new();

/// Inputs of one packet build.
#[derive(Clone, Debug)]
pub struct PacketRequest<'a> {
    pub mnemonic: &'a str,
    pub ica_address: &'a str,
    pub grpc_addr: &'a str,
    pub chain_id: &'a str,
    pub file: &'a Path,
    pub owner_hrp: &'a str,
}

impl PacketRequest<'_> {
    pub fn args(&self) -> Vec<String> {
        vec![
            "--mnemonic".to_string(),
            self.mnemonic.to_string(),
            "--ica-address".to_string(),
            self.ica_address.to_string(),
            "--grpc-addr".to_string(),
            self.grpc_addr.to_string(),
            "--chain-id".to_string(),
            self.chain_id.to_string(),
            "--file".to_string(),
            self.file.display().to_string(),
            "--owner-hrp".to_string(),
            self.owner_hrp.to_string(),
        ]
    }
}

/// Produces the packet JSON submitted through the interchain account.
pub trait PacketSource {
    fn build_packet(&self, request: &PacketRequest<'_>) -> Result<Vec<u8>, DriverError>;
}

#[derive(Clone, Debug)]
pub struct BuildpacketTool {
    path: PathBuf,
}

impl BuildpacketTool {
    /// Compiles the binary on first use; later calls, from any thread, reuse it.
    pub fn compiled() -> Result<&'static Self, DriverError> {
        BUILDPACKET.get_or_try_init(|| {
            tracing::info!("compiling {BUILDPACKET_BIN}");
            let run = CargoBuild::new()
                .manifest_path(workspace_manifest())
                .package(BUILDPACKET_PACKAGE)
                .bin(BUILDPACKET_BIN)
                .current_release()
                .current_target()
                .run()
                .map_err(|e| DriverError::Compile {
                    reason: e.to_string(),
                })?;
            Ok(Self::at(run.path()))
        })
    }

    /// A tool backed by an already built binary.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn command(&self) -> Command {
        Command::new(&self.path)
    }

    /// Runs the binary with raw `args`, whatever its exit status.
    pub fn run<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> Result<Output, DriverError> {
        self.command()
            .args(args)
            .output()
            .map_err(|e| DriverError::Spawn {
                command: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

impl PacketSource for BuildpacketTool {
    fn build_packet(&self, request: &PacketRequest<'_>) -> Result<Vec<u8>, DriverError> {
        let output = self.run(&request.args())?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(%stderr, "buildpacket stderr");

        if !output.status.success() {
            return Err(DriverError::Builder { stderr });
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(DriverError::Builder {
                stderr: format!("empty output; {stderr}"),
            });
        }
        Ok(output.stdout)
    }
}

fn workspace_manifest() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("Cargo.toml")
}
