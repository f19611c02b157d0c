//! A Cosmos SDK chain node driven through its command line interface.

use ibc_core_host_types::identifiers::ConnectionId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{ChainConfig, NodeEnv};
use crate::error::DriverError;
use crate::exec::Exec;
use crate::wait::HeightSource;

pub const KEYRING_BACKEND: &str = "test";

/// Broadcast or query result of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

impl TxResponse {
    /// Fails with the raw log when the chain reports a non-zero code.
    pub fn ensure_success(self, operation: &'static str) -> Result<Self, DriverError> {
        if self.code != 0 {
            return Err(DriverError::ChainRejected {
                operation,
                code: self.code,
                raw_log: self.raw_log,
            });
        }
        Ok(self)
    }
}

/// An entry of `q action list-actions`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ActionRecord {
    #[serde(default)]
    pub creator: String,
    #[serde(rename = "actionID", default)]
    pub action_id: String,
    #[serde(rename = "actionType", default)]
    pub action_type: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Deserialize)]
struct ListActionsResponse {
    #[serde(default)]
    actions: Vec<ActionRecord>,
}

#[derive(Deserialize)]
struct InterchainAccountResponse {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(alias = "SyncInfo")]
    sync_info: SyncInfo,
}

#[derive(Deserialize)]
struct SyncInfo {
    latest_block_height: String,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: Option<Coin>,
}

#[derive(Deserialize)]
struct Coin {
    #[serde(default)]
    amount: String,
}

/// A chain node together with the executor that reaches it.
#[derive(Debug)]
pub struct CosmosChain<E> {
    config: ChainConfig,
    node: NodeEnv,
    exec: E,
}

impl<E: Exec> CosmosChain<E> {
    pub fn new(config: ChainConfig, node: NodeEnv, exec: E) -> Self {
        Self { config, node, exec }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn exec(&self) -> &E {
        &self.exec
    }

    pub fn home_dir(&self) -> &str {
        &self.node.home_dir
    }

    /// Runs the chain binary with `args`.
    fn cli(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>, DriverError> {
        let mut command = vec![self.config.bin.clone()];
        command.extend(args.iter().map(|a| a.to_string()));
        Ok(self.exec.exec(&command, stdin)?.stdout)
    }

    fn query<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        args: &[&str],
    ) -> Result<T, DriverError> {
        let mut command = args.to_vec();
        command.extend(["--node", self.node.rpc_addr.as_str(), "--output", "json"]);
        let stdout = self.cli(&command, None)?;
        parse_json(operation, &stdout)
    }

    fn tx(
        &self,
        operation: &'static str,
        args: &[&str],
        from: &str,
        gas_adjustment: f64,
    ) -> Result<TxResponse, DriverError> {
        let gas_adjustment = gas_adjustment.to_string();
        let mut command = args.to_vec();
        command.extend([
            "--from",
            from,
            "--gas",
            "auto",
            "--gas-adjustment",
            gas_adjustment.as_str(),
            "--gas-prices",
            self.config.gas_prices.as_str(),
            "-y",
            "--chain-id",
            self.config.chain_id.as_str(),
            "--node",
            self.node.rpc_addr.as_str(),
            "--home",
            self.node.home_dir.as_str(),
            "--keyring-backend",
            KEYRING_BACKEND,
            "--output",
            "json",
        ]);

        let stdout = self.cli(&command, None)?;
        let response: TxResponse = parse_json(operation, &stdout)?;
        tracing::info!(
            chain = %self.config.chain_id,
            operation,
            txhash = %response.txhash,
            code = response.code,
            "broadcast"
        );
        Ok(response)
    }

    /// Imports `mnemonic` into the node's test keyring and returns the key's address.
    pub fn recover_key(&self, name: &str, mnemonic: &str) -> Result<String, DriverError> {
        let input = format!("{mnemonic}\n");
        self.cli(
            &[
                "keys",
                "add",
                name,
                "--recover",
                "--keyring-backend",
                KEYRING_BACKEND,
                "--home",
                self.node.home_dir.as_str(),
            ],
            Some(input.as_bytes()),
        )?;
        self.key_address(name)
    }

    pub fn key_address(&self, name: &str) -> Result<String, DriverError> {
        let stdout = self.cli(
            &[
                "keys",
                "show",
                name,
                "-a",
                "--keyring-backend",
                KEYRING_BACKEND,
                "--home",
                self.node.home_dir.as_str(),
            ],
            None,
        )?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    pub fn latest_height(&self) -> Result<u64, DriverError> {
        let stdout = self.cli(&["status", "--node", self.node.rpc_addr.as_str()], None)?;
        let status: StatusResponse = parse_json("status", &stdout)?;
        parse_number("status", &status.sync_info.latest_block_height)
    }

    /// Balance of `address` in `denom`, zero when absent.
    pub fn balance(&self, address: &str, denom: &str) -> Result<u128, DriverError> {
        let response: BalanceResponse =
            self.query("balance", &["q", "bank", "balance", address, denom])?;
        match response.balance {
            Some(coin) if !coin.amount.is_empty() => parse_number("balance", &coin.amount),
            _ => Ok(0),
        }
    }

    pub fn bank_send(
        &self,
        from_key: &str,
        to: &str,
        amount: &str,
    ) -> Result<TxResponse, DriverError> {
        self.tx(
            "bank send",
            &["tx", "bank", "send", from_key, to, amount],
            from_key,
            self.config.gas_adjustment,
        )
    }

    /// Registers an interchain account owned by `owner_key` over `connection_id`.
    pub fn register_ica(
        &self,
        owner_key: &str,
        connection_id: &ConnectionId,
    ) -> Result<TxResponse, DriverError> {
        self.tx(
            "register interchain account",
            &[
                "tx",
                "interchain-accounts",
                "controller",
                "register",
                connection_id.as_str(),
            ],
            owner_key,
            self.config.gas_adjustment,
        )
    }

    /// Address of the interchain account of `owner`, `None` while the
    /// channel handshake has not completed.
    pub fn query_ica_address(
        &self,
        owner: &str,
        connection_id: &ConnectionId,
    ) -> Result<Option<String>, DriverError> {
        let result: Result<InterchainAccountResponse, _> = self.query(
            "interchain account",
            &[
                "q",
                "interchain-accounts",
                "controller",
                "interchain-account",
                owner,
                connection_id.as_str(),
            ],
        );
        match result {
            Ok(response) if !response.address.is_empty() => Ok(Some(response.address)),
            Ok(_) => Ok(None),
            Err(DriverError::Command { ref stderr, .. }) if is_not_found(stderr) => {
                tracing::debug!(%stderr, "interchain account not available yet");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Submits the packet stored at `packet_path` on the node.
    pub fn send_ica_tx(
        &self,
        owner_key: &str,
        connection_id: &ConnectionId,
        packet_path: &str,
    ) -> Result<TxResponse, DriverError> {
        self.tx(
            "send interchain account tx",
            &[
                "tx",
                "interchain-accounts",
                "controller",
                "send-tx",
                connection_id.as_str(),
                packet_path,
            ],
            owner_key,
            2.0,
        )
    }

    pub fn query_tx(&self, txhash: &str) -> Result<TxResponse, DriverError> {
        self.query("tx", &["q", "tx", txhash])
    }

    pub fn list_actions(&self) -> Result<Vec<ActionRecord>, DriverError> {
        let response: ListActionsResponse =
            self.query("list actions", &["q", "action", "list-actions"])?;
        Ok(response.actions)
    }

    /// Writes `contents` to `file_name` under the node's home directory and
    /// returns the full path.
    pub fn write_file(&self, file_name: &str, contents: &[u8]) -> Result<String, DriverError> {
        let path = format!("{}/{file_name}", self.node.home_dir.trim_end_matches('/'));
        let command = vec!["sh".to_string(), "-c".to_string(), format!("cat > '{path}'")];
        self.exec.exec(&command, Some(contents))?;
        Ok(path)
    }

    pub fn read_genesis(&self) -> Result<serde_json::Value, DriverError> {
        let path = format!("{}/config/genesis.json", self.node.home_dir.trim_end_matches('/'));
        let output = self.exec.exec(&["cat".to_string(), path], None)?;
        parse_json("genesis", &output.stdout)
    }
}

/// Whether a failed query only reports that the queried entry does not exist yet.
fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("not found") || stderr.contains("notfound")
}

impl<E: Exec> HeightSource for CosmosChain<E> {
    fn name(&self) -> &str {
        &self.config.chain_id
    }

    fn height(&self) -> Result<u64, DriverError> {
        self.latest_height()
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    operation: &'static str,
    stdout: &[u8],
) -> Result<T, DriverError> {
    serde_json::from_slice(stdout).map_err(|e| DriverError::Output {
        operation,
        reason: format!("{e}: {}", String::from_utf8_lossy(stdout).trim()),
    })
}

fn parse_number<T: core::str::FromStr>(
    operation: &'static str,
    value: &str,
) -> Result<T, DriverError> {
    value.parse().map_err(|_| DriverError::Output {
        operation,
        reason: format!("`{value}` is not a number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{lumera_chain_config, HarnessEnv};
    use crate::scripted::ScriptedExec;

    fn lumera(exec: ScriptedExec) -> CosmosChain<ScriptedExec> {
        let env = HarnessEnv::from_lookup(|_| None);
        CosmosChain::new(lumera_chain_config("v1.10.1", false), env.lumera, exec)
    }

    #[test]
    fn test_tx_flags() {
        let exec = ScriptedExec::new().on(&["bank", "send"], r#"{"txhash":"AB","code":0}"#);
        let chain = lumera(exec);

        let response = chain.bank_send("faucet", "lumera1ica", "10ulume").unwrap();
        assert_eq!(response.txhash, "AB");

        let call = chain.exec.calls().remove(0);
        assert!(call.starts_with("lumerad tx bank send faucet lumera1ica 10ulume --from faucet"));
        assert!(call.contains("--gas-prices 0.025ulume"));
        assert!(call.contains("--chain-id lumera-testnet-2"));
        assert!(call.contains("--keyring-backend test"));
        assert!(call.ends_with("--output json"));
    }

    #[test]
    fn test_rejected_tx() {
        let response: TxResponse =
            serde_json::from_str(r#"{"txhash":"AB","code":5,"raw_log":"insufficient funds"}"#)
                .unwrap();
        let err = response.ensure_success("bank send").unwrap_err();
        assert_eq!(
            err.to_string(),
            "chain rejected `bank send` with code 5: insufficient funds"
        );
    }

    #[test]
    fn test_status_height_formats() {
        let chain = lumera(ScriptedExec::new().with_height(41));
        assert_eq!(chain.latest_height().unwrap(), 41);

        let legacy: StatusResponse =
            serde_json::from_str(r#"{"SyncInfo":{"latest_block_height":"9"}}"#).unwrap();
        assert_eq!(legacy.sync_info.latest_block_height, "9");
    }

    #[test]
    fn test_ica_address_absent_until_registered() {
        let connection = ConnectionId::new(0);
        let chain = lumera(ScriptedExec::new().fail_on(&["interchain-account"], "not found"));
        assert_eq!(chain.query_ica_address("osmo1owner", &connection).unwrap(), None);

        let chain = lumera(
            ScriptedExec::new().on(&["interchain-account"], r#"{"address":"lumera1ica"}"#),
        );
        assert_eq!(
            chain.query_ica_address("osmo1owner", &connection).unwrap(),
            Some("lumera1ica".to_string())
        );
    }

    #[test]
    fn test_ica_address_query_failure_is_not_pending() {
        let chain = lumera(ScriptedExec::new().fail_on(
            &["interchain-account"],
            "Error: post failed: dial tcp: lookup osmosis-val: no such host",
        ));
        assert!(matches!(
            chain.query_ica_address("osmo1owner", &ConnectionId::new(0)),
            Err(DriverError::Command { .. })
        ));

        let chain = lumera(ScriptedExec::new().fail_on(
            &["interchain-account"],
            "rpc error: code = NotFound desc = failed to retrieve account address",
        ));
        assert_eq!(
            chain
                .query_ica_address("osmo1owner", &ConnectionId::new(0))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_list_actions() {
        let chain = lumera(ScriptedExec::new().on(
            &["list-actions"],
            r#"{"actions":[{"creator":"lumera1ica","actionID":"1","actionType":"ACTION_TYPE_CASCADE","state":"ACTION_STATE_PENDING"}],"pagination":{}}"#,
        ));
        let actions = chain.list_actions().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_id, "1");
        assert_eq!(actions[0].action_type, "ACTION_TYPE_CASCADE");
    }

    #[test]
    fn test_balance_and_write_file() {
        let chain = lumera(
            ScriptedExec::new()
                .on(&["bank", "balance"], r#"{"balance":{"denom":"ulume","amount":"25"}}"#)
                .on(&["cat >"], ""),
        );
        assert_eq!(chain.balance("lumera1ica", "ulume").unwrap(), 25);

        let path = chain.write_file("ica_packet.json", b"{}").unwrap();
        assert_eq!(path, "/var/cosmos-chain/lumera/ica_packet.json");
        assert_eq!(chain.exec.stdin_of("cat >").as_deref(), Some(&b"{}"[..]));
    }
}
