//! The `rly` relayer driven through its command line interface.

use core::str::FromStr;

use ibc_core_host_types::identifiers::{ChannelId, ConnectionId, PortId};
use lumera_ica_packet_types::CONTROLLER_PORT_PREFIX;
use serde::Deserialize;

use crate::chain::parse_json;
use crate::error::DriverError;
use crate::exec::Exec;

#[derive(Deserialize)]
struct RawConnection {
    id: String,
}

#[derive(Deserialize)]
struct RawChannel {
    port_id: String,
    channel_id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    connection_hops: Vec<String>,
}

/// A channel end as listed by the relayer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub state: String,
    pub connection_hops: Vec<String>,
}

impl TryFrom<RawChannel> for ChannelInfo {
    type Error = DriverError;

    fn try_from(raw: RawChannel) -> Result<Self, Self::Error> {
        Ok(Self {
            port_id: parse_identifier(&raw.port_id)?,
            channel_id: parse_identifier(&raw.channel_id)?,
            state: raw.state,
            connection_hops: raw.connection_hops,
        })
    }
}

#[derive(Debug)]
pub struct Relayer<E> {
    exec: E,
    path: String,
    home: Option<String>,
}

impl<E: Exec> Relayer<E> {
    /// A relayer relaying over the configured `path`.
    pub fn new(exec: E, path: impl Into<String>, home: Option<String>) -> Self {
        Self {
            exec,
            path: path.into(),
            home,
        }
    }

    pub fn exec(&self) -> &E {
        &self.exec
    }

    fn rly(&self, args: &[&str]) -> Result<Vec<u8>, DriverError> {
        let mut command = vec!["rly".to_string()];
        command.extend(args.iter().map(|a| a.to_string()));
        if let Some(home) = &self.home {
            command.extend(["--home".to_string(), home.clone()]);
        }
        Ok(self.exec.exec(&command, None)?.stdout)
    }

    /// Connections of `chain`, in the order the relayer lists them.
    pub fn connections(&self, chain: &str) -> Result<Vec<ConnectionId>, DriverError> {
        let stdout = self.rly(&["q", "connections", chain])?;
        json_lines::<RawConnection>("connections", &stdout)?
            .into_iter()
            .map(|raw| parse_identifier(&raw.id))
            .collect()
    }

    /// First connection of `chain`.
    pub fn first_connection(&self, chain: &str) -> Result<ConnectionId, DriverError> {
        self.connections(chain)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoConnection {
                chain: chain.to_string(),
            })
    }

    pub fn channels(&self, chain: &str) -> Result<Vec<ChannelInfo>, DriverError> {
        let stdout = self.rly(&["q", "channels", chain])?;
        json_lines::<RawChannel>("channels", &stdout)?
            .into_iter()
            .map(ChannelInfo::try_from)
            .collect()
    }

    /// The interchain account channel of `chain`, found by its controller port.
    pub fn ica_channel(&self, chain: &str) -> Result<ChannelInfo, DriverError> {
        self.channels(chain)?
            .into_iter()
            .find(|channel| channel.port_id.as_str().starts_with(CONTROLLER_PORT_PREFIX))
            .ok_or_else(|| DriverError::NoChannel {
                chain: chain.to_string(),
                prefix: CONTROLLER_PORT_PREFIX.to_string(),
            })
    }

    /// Relays every pending packet and acknowledgement on `channel_id`.
    pub fn flush(&self, channel_id: &ChannelId) -> Result<(), DriverError> {
        tracing::info!(path = %self.path, channel = %channel_id, "flushing");
        self.rly(&["tx", "flush", self.path.as_str(), channel_id.as_str()])?;
        Ok(())
    }
}

/// Parses a single JSON document, or one JSON document per line.
fn json_lines<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    stdout: &[u8],
) -> Result<Vec<T>, DriverError> {
    if let Ok(all) = serde_json::from_slice::<Vec<T>>(stdout) {
        return Ok(all);
    }
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .map(|line| parse_json(operation, line.as_bytes()))
        .collect()
}

fn parse_identifier<T>(value: &str) -> Result<T, DriverError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    value.parse().map_err(|e: T::Err| DriverError::Identifier {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedExec;

    const CHANNELS: &str = r#"{"state":"STATE_OPEN","ordering":"ORDER_UNORDERED","counterparty":{"port_id":"transfer","channel_id":"channel-0"},"connection_hops":["connection-0"],"version":"ics20-1","port_id":"transfer","channel_id":"channel-0"}
{"state":"STATE_OPEN","ordering":"ORDER_ORDERED","counterparty":{"port_id":"icahost","channel_id":"channel-1"},"connection_hops":["connection-0"],"version":"{}","port_id":"icacontroller-osmo1owner","channel_id":"channel-1"}
"#;

    #[test]
    fn test_connections() {
        let exec = ScriptedExec::new().on(
            &["q connections"],
            r#"{"id":"connection-0","client_id":"07-tendermint-0","state":"STATE_OPEN"}"#,
        );
        let relayer = Relayer::new(exec, "osmo-lumera", None);
        assert_eq!(
            relayer.first_connection("osmosis-test-1").unwrap(),
            ConnectionId::new(0)
        );
    }

    #[test]
    fn test_no_connection() {
        let relayer = Relayer::new(ScriptedExec::new().on(&["q connections"], ""), "p", None);
        assert!(matches!(
            relayer.first_connection("osmosis-test-1"),
            Err(DriverError::NoConnection { .. })
        ));
    }

    #[test]
    fn test_ica_channel_is_found_by_port_prefix() {
        let relayer = Relayer::new(
            ScriptedExec::new().on(&["q channels"], CHANNELS),
            "osmo-lumera",
            None,
        );
        let channel = relayer.ica_channel("osmosis-test-1").unwrap();
        assert_eq!(channel.channel_id, ChannelId::new(1));
        assert_eq!(channel.port_id.as_str(), "icacontroller-osmo1owner");
    }

    #[test]
    fn test_no_ica_channel() {
        let transfer_only = CHANNELS.lines().next().unwrap();
        let relayer = Relayer::new(
            ScriptedExec::new().on(&["q channels"], transfer_only),
            "osmo-lumera",
            None,
        );
        assert!(matches!(
            relayer.ica_channel("osmosis-test-1"),
            Err(DriverError::NoChannel { .. })
        ));
    }

    #[test]
    fn test_flush_passes_path_and_home() {
        let relayer = Relayer::new(
            ScriptedExec::new().on(&["tx flush"], ""),
            "osmo-lumera",
            Some("/home/relayer".to_string()),
        );
        relayer.flush(&ChannelId::new(1)).unwrap();
        assert_eq!(
            relayer.exec.calls(),
            vec!["rly tx flush osmo-lumera channel-1 --home /home/relayer"]
        );
    }
}
