//! Bounded waits on asynchronous chain progress.

use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::error::DriverError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(120), Duration::from_secs(2))
    }
}

/// Calls `check` every `interval` until it yields a value, for at most
/// `timeout`. Errors from `check` abort the poll.
pub fn poll_until<T>(
    what: &str,
    config: PollConfig,
    mut check: impl FnMut() -> Result<Option<T>, DriverError>,
) -> Result<T, DriverError> {
    let start = Instant::now();
    loop {
        if let Some(value) = check()? {
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(DriverError::Timeout {
                what: what.to_string(),
                elapsed_secs: elapsed.as_secs(),
            });
        }
        tracing::trace!(what, elapsed_ms = elapsed.as_millis() as u64, "still waiting");
        sleep(config.interval);
    }
}

/// Anything with a block height.
pub trait HeightSource {
    fn name(&self) -> &str;

    fn height(&self) -> Result<u64, DriverError>;
}

/// Waits until every chain has advanced `blocks` blocks past the height it
/// reported when the wait began.
pub fn wait_for_blocks(
    blocks: u64,
    chains: &[&dyn HeightSource],
    config: PollConfig,
) -> Result<(), DriverError> {
    let targets = chains
        .iter()
        .map(|chain| Ok((*chain, chain.height()? + blocks)))
        .collect::<Result<Vec<_>, DriverError>>()?;

    for (chain, target) in targets {
        poll_until(&format!("{} to reach height {target}", chain.name()), config, || {
            Ok((chain.height()? >= target).then_some(()))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const FAST: PollConfig = PollConfig::new(Duration::from_millis(50), Duration::from_millis(1));

    struct CountingChain {
        height: Cell<u64>,
    }

    impl HeightSource for CountingChain {
        fn name(&self) -> &str {
            "counting"
        }

        fn height(&self) -> Result<u64, DriverError> {
            let height = self.height.get();
            self.height.set(height + 1);
            Ok(height)
        }
    }

    struct StuckChain;

    impl HeightSource for StuckChain {
        fn name(&self) -> &str {
            "stuck"
        }

        fn height(&self) -> Result<u64, DriverError> {
            Ok(7)
        }
    }

    #[test]
    fn test_poll_until_returns_first_value() {
        let mut calls = 0;
        let value = poll_until("third call", FAST, || {
            calls += 1;
            Ok((calls == 3).then_some(calls))
        })
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_poll_until_times_out() {
        let err = poll_until::<()>("nothing", FAST, || Ok(None)).unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("nothing"));
    }

    #[test]
    fn test_poll_until_aborts_on_error() {
        let err = poll_until::<()>("failure", FAST, || {
            Err(DriverError::Io {
                reason: "gone".to_string(),
            })
        })
        .unwrap_err();
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_wait_for_blocks() {
        let chain = CountingChain {
            height: Cell::new(10),
        };
        wait_for_blocks(3, &[&chain], FAST).unwrap();
        assert!(chain.height.get() >= 13);
    }

    #[test]
    fn test_wait_for_blocks_on_halted_chain() {
        let err = wait_for_blocks(1, &[&StuckChain], FAST).unwrap_err();
        assert!(err.is_timeout());
    }
}
