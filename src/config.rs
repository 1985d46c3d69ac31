//! Runtime configuration for the outbox.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

/// Default admission queue capacity of the dispatcher.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Default pause between transient retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Tunables for the dispatcher and live-edit sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxConfig {
    /// Bounded admission queue size. Producers wait when it is full.
    pub queue_capacity: usize,
    /// Pause between attempts after a transient encryption or transport
    /// failure. Also the floor for rate-limit waits.
    pub retry_delay: Duration,
    /// Pause before a live-edit session retries a failed create or edit.
    pub stream_retry_delay: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_delay: DEFAULT_RETRY_DELAY,
            stream_retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl OutboxConfig {
    /// Read the config from the process environment.
    ///
    /// Every variable is optional and falls back to the default:
    /// - `OUTBOX_QUEUE_CAPACITY`
    /// - `OUTBOX_RETRY_DELAY_MS`
    /// - `OUTBOX_STREAM_RETRY_DELAY_MS`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            queue_capacity: parse::<usize, _>(&lookup, "OUTBOX_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            retry_delay: parse::<u64, _>(&lookup, "OUTBOX_RETRY_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            stream_retry_delay: parse::<u64, _>(&lookup, "OUTBOX_STREAM_RETRY_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.stream_retry_delay),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the channels and retry loops cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queue_capacity == 0 {
            bail!("queue_capacity must be at least 1");
        }
        Ok(())
    }
}

/// Parse one optional variable straight into its target type, so values out
/// of range fail instead of wrapping.
fn parse<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a non-negative integer in range, got {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = OutboxConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, OutboxConfig::default());
        assert_eq!(config.queue_capacity, 256);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = OutboxConfig::from_lookup(lookup_from(&[
            ("OUTBOX_QUEUE_CAPACITY", "16"),
            ("OUTBOX_RETRY_DELAY_MS", "250"),
            ("OUTBOX_STREAM_RETRY_DELAY_MS", " 50 "),
        ]))
        .unwrap();

        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.stream_retry_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_garbage_value_is_rejected() {
        let err = OutboxConfig::from_lookup(lookup_from(&[("OUTBOX_RETRY_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("OUTBOX_RETRY_DELAY_MS"));
    }

    #[test]
    fn test_out_of_range_value_is_rejected_not_truncated() {
        // u64::MAX + 1 and u128::MAX + 1 cannot fit any usize or u64.
        for raw in ["18446744073709551616", "340282366920938463463374607431768211456"] {
            let err = OutboxConfig::from_lookup(lookup_from(&[("OUTBOX_QUEUE_CAPACITY", raw)]))
                .unwrap_err();
            assert!(err.to_string().contains("OUTBOX_QUEUE_CAPACITY"), "{raw}");

            let err = OutboxConfig::from_lookup(lookup_from(&[("OUTBOX_RETRY_DELAY_MS", raw)]))
                .unwrap_err();
            assert!(err.to_string().contains("OUTBOX_RETRY_DELAY_MS"), "{raw}");
        }
    }

    #[test]
    fn test_negative_value_is_rejected() {
        assert!(
            OutboxConfig::from_lookup(lookup_from(&[("OUTBOX_QUEUE_CAPACITY", "-1")])).is_err()
        );
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(
            OutboxConfig::from_lookup(lookup_from(&[("OUTBOX_QUEUE_CAPACITY", "0")])).is_err()
        );
    }
}
