//! Queries the packet builder runs against the host chain over gRPC.

use std::time::Duration;

use ibc_proto::cosmos::auth::v1beta1::query_client::QueryClient as AuthQueryClient;
use ibc_proto::cosmos::auth::v1beta1::{BaseAccount, QueryAccountRequest};
use ibc_proto::cosmos::base::tendermint::v1beta1::service_client::ServiceClient;
use ibc_proto::cosmos::base::tendermint::v1beta1::GetNodeInfoRequest;
use ibc_proto::cosmos::base::v1beta1::Coin;
use ibc_proto::google::protobuf::Any;
use ibc_proto::ibc::applications::interchain_accounts::v1::InterchainAccount as RawInterchainAccount;
use prost::Message;
use tokio::runtime::Runtime;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

use crate::error::BuildError;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ACTION_PARAMS_PATH: &str = "/lumera.action.v1.Query/Params";

const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
const INTERCHAIN_ACCOUNT_TYPE_URL: &str = "/ibc.applications.interchain_accounts.v1.InterchainAccount";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// The chain id the node runs.
    pub network: String,
    pub moniker: String,
    pub app_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Fee parameters of the host action module.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionParams {
    pub base_action_fee: Option<Coin>,
    pub fee_per_kbyte: Option<Coin>,
}

/// Raw `lumera.action.v1.QueryParamsRequest`.
#[derive(Clone, PartialEq, Message)]
pub struct RawQueryParamsRequest {}

/// Raw `lumera.action.v1.QueryParamsResponse`.
#[derive(Clone, PartialEq, Message)]
pub struct RawQueryParamsResponse {
    #[prost(message, optional, tag = "1")]
    pub params: Option<RawActionParams>,
}

/// The fee fields of raw `lumera.action.v1.Params`; the remaining fields
/// are skipped when decoding.
#[derive(Clone, PartialEq, Message)]
pub struct RawActionParams {
    #[prost(message, optional, tag = "1")]
    pub base_action_fee: Option<Coin>,
    #[prost(message, optional, tag = "2")]
    pub fee_per_kbyte: Option<Coin>,
}

impl From<RawActionParams> for ActionParams {
    fn from(raw: RawActionParams) -> Self {
        Self {
            base_action_fee: raw.base_action_fee,
            fee_per_kbyte: raw.fee_per_kbyte,
        }
    }
}

/// Read-only view of the host chain the builder needs.
pub trait ChainQuerier {
    fn node_info(&mut self) -> Result<NodeInfo, BuildError>;

    /// Returns `None` when the chain does not know the account yet.
    fn account(&mut self, address: &str) -> Result<Option<AccountInfo>, BuildError>;

    fn action_params(&mut self) -> Result<ActionParams, BuildError>;
}

/// [`ChainQuerier`] backed by a tonic channel, driven on a private
/// current-thread runtime.
pub struct GrpcQuerier {
    runtime: Runtime,
    channel: Channel,
}

impl GrpcQuerier {
    /// Connects once, bounded by [`CONNECT_TIMEOUT`]. There is no retry.
    pub fn connect(endpoint: &str) -> Result<Self, BuildError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BuildError::Runtime {
                reason: e.to_string(),
            })?;

        let grpc_endpoint =
            Endpoint::from_shared(endpoint.to_string()).map_err(|e| BuildError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let channel = runtime
            .block_on(
                grpc_endpoint
                    .connect_timeout(CONNECT_TIMEOUT)
                    .timeout(CONNECT_TIMEOUT)
                    .connect(),
            )
            .map_err(|e| BuildError::Connect {
                endpoint: endpoint.to_string(),
                reason: error_chain(&e),
            })?;

        tracing::info!(%endpoint, "connected to host gRPC");

        Ok(Self { runtime, channel })
    }
}

impl ChainQuerier for GrpcQuerier {
    fn node_info(&mut self) -> Result<NodeInfo, BuildError> {
        let mut client = ServiceClient::new(self.channel.clone());
        let response = self
            .runtime
            .block_on(client.get_node_info(GetNodeInfoRequest {}))
            .map_err(|e| query_error("node_info", &e))?
            .into_inner();

        let node = response.default_node_info.ok_or_else(|| BuildError::Query {
            query: "node_info",
            reason: "response carries no node info".to_string(),
        })?;

        Ok(NodeInfo {
            network: node.network,
            moniker: node.moniker,
            app_version: response
                .application_version
                .map(|v| v.version)
                .unwrap_or_default(),
        })
    }

    fn account(&mut self, address: &str) -> Result<Option<AccountInfo>, BuildError> {
        let mut client = AuthQueryClient::new(self.channel.clone());
        let request = QueryAccountRequest {
            address: address.to_string(),
        };

        let response = match self.runtime.block_on(client.account(request)) {
            Ok(response) => response.into_inner(),
            Err(status) if status.code() == Code::NotFound => return Ok(None),
            Err(status) => return Err(query_error("account", &status)),
        };

        response.account.map(decode_account).transpose()
    }

    fn action_params(&mut self) -> Result<ActionParams, BuildError> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        let codec = ProstCodec::<RawQueryParamsRequest, RawQueryParamsResponse>::default();
        let path = PathAndQuery::from_static(ACTION_PARAMS_PATH);

        let response = self
            .runtime
            .block_on(async {
                grpc.ready().await.map_err(|e| BuildError::Query {
                    query: "action_params",
                    reason: format!("service not ready: {e}"),
                })?;
                grpc.unary(tonic::Request::new(RawQueryParamsRequest {}), path, codec)
                    .await
                    .map_err(|e| query_error("action_params", &e))
            })?
            .into_inner();

        Ok(response.params.map(ActionParams::from).unwrap_or_default())
    }
}

/// Decodes a base account, or the base account inside an interchain account.
fn decode_account(any: Any) -> Result<AccountInfo, BuildError> {
    let decode_err = |e: prost::DecodeError| BuildError::Query {
        query: "account",
        reason: e.to_string(),
    };

    let base = match any.type_url.as_str() {
        BASE_ACCOUNT_TYPE_URL => BaseAccount::decode(any.value.as_slice()).map_err(decode_err)?,
        INTERCHAIN_ACCOUNT_TYPE_URL => RawInterchainAccount::decode(any.value.as_slice())
            .map_err(decode_err)?
            .base_account
            .ok_or_else(|| BuildError::Query {
                query: "account",
                reason: "interchain account has no base account".to_string(),
            })?,
        other => {
            return Err(BuildError::Query {
                query: "account",
                reason: format!("unsupported account type `{other}`"),
            })
        }
    };

    Ok(AccountInfo {
        address: base.address,
        account_number: base.account_number,
        sequence: base.sequence,
    })
}

fn query_error(query: &'static str, status: &tonic::Status) -> BuildError {
    BuildError::Query {
        query,
        reason: format!("{}: {}", status.code(), status.message()),
    }
}

/// Flattens an error and its sources into one line; tonic transport errors
/// keep the useful part in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(amount: &str) -> Coin {
        Coin {
            denom: "ulume".to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn test_params_response_skips_unknown_fields() {
        // fee fields followed by an unrelated varint field (tag 3)
        let mut params = RawActionParams {
            base_action_fee: Some(coin("10000")),
            fee_per_kbyte: Some(coin("10")),
        }
        .encode_to_vec();
        params.extend_from_slice(&[0x18, 0x0a]);

        let mut response = vec![0x0a, params.len() as u8];
        response.extend_from_slice(&params);

        let decoded = RawQueryParamsResponse::decode(response.as_slice()).unwrap();
        let params = ActionParams::from(decoded.params.unwrap());
        assert_eq!(params.base_action_fee, Some(coin("10000")));
        assert_eq!(params.fee_per_kbyte, Some(coin("10")));
    }

    #[test]
    fn test_decode_interchain_account() {
        let base = BaseAccount {
            address: "lumera1ica".to_string(),
            pub_key: None,
            account_number: 12,
            sequence: 0,
        };
        let any = Any {
            type_url: INTERCHAIN_ACCOUNT_TYPE_URL.to_string(),
            value: RawInterchainAccount {
                base_account: Some(base),
                account_owner: "icacontroller-osmo1owner".to_string(),
            }
            .encode_to_vec(),
        };

        let account = decode_account(any).unwrap();
        assert_eq!(account.address, "lumera1ica");
        assert_eq!(account.account_number, 12);
    }

    #[test]
    fn test_decode_unknown_account_type() {
        let any = Any {
            type_url: "/cosmos.vesting.v1beta1.DelayedVestingAccount".to_string(),
            value: vec![],
        };
        assert!(matches!(
            decode_account(any),
            Err(BuildError::Query { query: "account", .. })
        ));
    }

    #[test]
    fn test_connect_to_malformed_endpoint() {
        let err = GrpcQuerier::connect("http://[::1").err().unwrap();
        assert!(matches!(err, BuildError::InvalidEndpoint { .. }));
    }
}
