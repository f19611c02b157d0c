//! Chain configurations and the harness environment.

use std::time::Duration;

/// Lumera image tag used when `LUMERA_VERSION` is unset.
pub const DEFAULT_LUMERA_VERSION: &str = "v1.10.1";

pub const LUMERA_IMAGE_REPOSITORY: &str = "ghcr.io/lumeraprotocol/lumerad";
pub const LUMERA_LOCAL_IMAGE: &str = "lumerad-local";
pub const LUMERA_LOCAL_VERSION: &str = "local";

pub const OSMOSIS_IMAGE_REPOSITORY: &str = "ghcr.io/strangelove-ventures/heighliner/osmosis";
pub const OSMOSIS_VERSION: &str = "v25.0.0";

const IMAGE_UIDGID: &str = "1025:1025";
const TRUSTING_PERIOD: Duration = Duration::from_secs(336 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DockerImage {
    pub repository: String,
    pub version: String,
    pub uid_gid: String,
}

impl DockerImage {
    /// `repository:version`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.version)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: String,
    pub images: Vec<DockerImage>,
    pub bin: String,
    pub bech32_prefix: String,
    pub denom: String,
    pub gas_prices: String,
    pub gas_adjustment: f64,
    pub trusting_period: Duration,
    pub additional_start_args: Vec<String>,
}

/// Lumera host chain config for an image `version`, opaque to the harness.
/// `use_local_image` selects the locally built `lumerad-local:local` image.
pub fn lumera_chain_config(version: &str, use_local_image: bool) -> ChainConfig {
    let image = if use_local_image {
        DockerImage {
            repository: LUMERA_LOCAL_IMAGE.to_string(),
            version: LUMERA_LOCAL_VERSION.to_string(),
            uid_gid: IMAGE_UIDGID.to_string(),
        }
    } else {
        DockerImage {
            repository: LUMERA_IMAGE_REPOSITORY.to_string(),
            version: version.to_string(),
            uid_gid: IMAGE_UIDGID.to_string(),
        }
    };

    ChainConfig {
        name: "lumera".to_string(),
        chain_id: "lumera-testnet-2".to_string(),
        images: vec![image],
        bin: "lumerad".to_string(),
        bech32_prefix: "lumera".to_string(),
        denom: "ulume".to_string(),
        gas_prices: "0.025ulume".to_string(),
        gas_adjustment: 1.5,
        trusting_period: TRUSTING_PERIOD,
        additional_start_args: vec!["--claims-path".to_string(), "/tmp/claims.csv".to_string()],
    }
}

/// Osmosis controller chain config.
pub fn osmosis_chain_config() -> ChainConfig {
    ChainConfig {
        name: "osmosis".to_string(),
        chain_id: "osmosis-test-1".to_string(),
        images: vec![DockerImage {
            repository: OSMOSIS_IMAGE_REPOSITORY.to_string(),
            version: OSMOSIS_VERSION.to_string(),
            uid_gid: IMAGE_UIDGID.to_string(),
        }],
        bin: "osmosisd".to_string(),
        bech32_prefix: "osmo".to_string(),
        denom: "uosmo".to_string(),
        gas_prices: "0.025uosmo".to_string(),
        gas_adjustment: 1.5,
        trusting_period: TRUSTING_PERIOD,
        additional_start_args: vec![],
    }
}

/// Where one chain node of the running topology can be reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEnv {
    /// Container the node runs in.
    pub container: String,
    pub home_dir: String,
    /// RPC address as seen from inside the container network.
    pub rpc_addr: String,
    /// Funded key in the node's test keyring.
    pub funder_key: String,
}

/// The running topology, described by environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessEnv {
    pub lumera_version: String,
    pub use_local_image: bool,
    pub lumera: NodeEnv,
    pub osmosis: NodeEnv,
    /// Lumera gRPC address as seen from the machine running the tests.
    pub lumera_grpc_addr: String,
    pub relayer_container: String,
    pub relayer_home: Option<String>,
    pub ibc_path: String,
}

impl HarnessEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            lumera_version: var("LUMERA_VERSION", DEFAULT_LUMERA_VERSION),
            use_local_image: lookup("USE_LOCAL_IMAGE").as_deref() == Some("true"),
            lumera: NodeEnv {
                container: var("LUMERA_CONTAINER", "lumera-val"),
                home_dir: var("LUMERA_HOME", "/var/cosmos-chain/lumera"),
                rpc_addr: var("LUMERA_RPC_ADDR", "http://lumera-val:26657"),
                funder_key: var("LUMERA_FUNDER_KEY", "faucet"),
            },
            osmosis: NodeEnv {
                container: var("OSMOSIS_CONTAINER", "osmosis-val"),
                home_dir: var("OSMOSIS_HOME", "/var/cosmos-chain/osmosis"),
                rpc_addr: var("OSMOSIS_RPC_ADDR", "http://osmosis-val:26657"),
                funder_key: var("OSMOSIS_FUNDER_KEY", "faucet"),
            },
            lumera_grpc_addr: var("LUMERA_GRPC_ADDR", "localhost:9090"),
            relayer_container: var("RELAYER_CONTAINER", "relayer"),
            relayer_home: lookup("RELAYER_HOME").filter(|v| !v.trim().is_empty()),
            ibc_path: var("IBC_PATH", "osmo-lumera"),
        }
    }

    pub fn lumera_config(&self) -> ChainConfig {
        lumera_chain_config(&self.lumera_version, self.use_local_image)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("v1.10.1", false, "ghcr.io/lumeraprotocol/lumerad:v1.10.1")]
    #[case("v1.9.1", false, "ghcr.io/lumeraprotocol/lumerad:v1.9.1")]
    #[case("v1.10.1", true, "lumerad-local:local")]
    fn test_lumera_image(
        #[case] version: &str,
        #[case] use_local_image: bool,
        #[case] expected: &str,
    ) {
        let config = lumera_chain_config(version, use_local_image);
        assert_eq!(config.images.len(), 1);
        assert_eq!(config.images[0].reference(), expected);
        assert_eq!(config.images[0].uid_gid, "1025:1025");
    }

    #[test]
    fn test_lumera_config() {
        let config = lumera_chain_config(DEFAULT_LUMERA_VERSION, false);
        assert_eq!(config.chain_id, "lumera-testnet-2");
        assert_eq!(config.bin, "lumerad");
        assert_eq!(config.bech32_prefix, "lumera");
        assert_eq!(config.denom, "ulume");
        assert_eq!(config.gas_prices, "0.025ulume");
        assert_eq!(config.trusting_period, Duration::from_secs(336 * 3600));
        assert_eq!(
            config.additional_start_args,
            vec!["--claims-path", "/tmp/claims.csv"]
        );
    }

    #[test]
    fn test_osmosis_config() {
        let config = osmosis_chain_config();
        assert_eq!(config.chain_id, "osmosis-test-1");
        assert_eq!(config.bech32_prefix, "osmo");
        assert_eq!(
            config.images[0].reference(),
            "ghcr.io/strangelove-ventures/heighliner/osmosis:v25.0.0"
        );
    }

    #[test]
    fn test_env_defaults() {
        let env = HarnessEnv::from_lookup(|_| None);
        assert_eq!(env.lumera_version, DEFAULT_LUMERA_VERSION);
        assert!(!env.use_local_image);
        assert_eq!(env.ibc_path, "osmo-lumera");
        assert_eq!(env.relayer_home, None);
        assert_eq!(env.lumera_grpc_addr, "localhost:9090");
        assert_eq!(env.lumera.container, "lumera-val");
        assert_eq!(env.osmosis.home_dir, "/var/cosmos-chain/osmosis");
    }

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", false)]
    #[case("1", false)]
    fn test_env_local_image(#[case] value: &str, #[case] expected: bool) {
        let vars = HashMap::from([
            ("USE_LOCAL_IMAGE", value.to_string()),
            ("LUMERA_VERSION", "v1.9.1".to_string()),
        ]);
        let env = HarnessEnv::from_lookup(|key| vars.get(key).cloned());

        assert_eq!(env.use_local_image, expected);
        assert_eq!(env.lumera_version, "v1.9.1");
        assert_eq!(
            env.lumera_config().images[0].reference() == "lumerad-local:local",
            expected
        );
    }
}
