use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use numgen::PoolConfig;

/// Runtime configuration for the `numgen` binary.
///
/// Starts `flowcount` generators that each emit a random value in
/// `[0, limit)` every `timeout` milliseconds, and runs until every value in
/// that range has been seen once. All values are parsed from CLI arguments or
/// environment variables (a `.env` file is honored).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "numgen",
    version,
    about = "Collects every value in [0, limit) from a pool of random generators"
)]
pub struct CliArgs {
    /// Number of generator tasks producing random values concurrently.
    ///
    /// Environment variable: `FLOW_COUNT`
    #[arg(long = "flowcount", env = "FLOW_COUNT")]
    pub flow_count: usize,

    /// Exclusive upper bound of generated values.
    ///
    /// The run completes once all `limit` distinct values in `[0, limit)`
    /// have been collected.
    ///
    /// Environment variable: `LIMIT`
    #[arg(long, env = "LIMIT")]
    pub limit: u64,

    /// Milliseconds between two values of the same generator.
    ///
    /// Environment variable: `TIMEOUT_MS`
    #[arg(long = "timeout", env = "TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Capacity of the channel between generators and the collector. A full
    /// channel blocks generators until the collector catches up.
    ///
    /// Defaults to `flowcount`.
    ///
    /// Environment variable: `VALUE_BUFFER`
    #[arg(long = "buffer", env = "VALUE_BUFFER")]
    pub value_buffer: Option<usize>,

    /// Milliseconds to wait for a worker to acknowledge a lifecycle command
    /// before aborting. `0` waits forever.
    ///
    /// Environment variable: `REPLY_TIMEOUT_MS`
    #[arg(long = "reply-timeout", env = "REPLY_TIMEOUT_MS", default_value_t = 3000)]
    pub reply_timeout_ms: u64,
}

impl TryFrom<CliArgs> for PoolConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.flow_count == 0 {
            bail!("FLOW_COUNT must be greater than 0");
        }
        if args.limit == 0 {
            bail!("LIMIT must be greater than 0");
        }
        if args.timeout_ms == 0 {
            bail!("TIMEOUT_MS must be greater than 0");
        }

        let mut config = Self::new(
            args.flow_count,
            args.limit,
            Duration::from_millis(args.timeout_ms),
        )?;

        if let Some(value_buffer) = args.value_buffer {
            if value_buffer == 0 {
                bail!("VALUE_BUFFER must be greater than 0");
            }
            config = config.with_value_buffer(value_buffer);
        }

        let reply_timeout =
            (args.reply_timeout_ms > 0).then(|| Duration::from_millis(args.reply_timeout_ms));
        config = config.with_reply_timeout(reply_timeout);

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<PoolConfig> {
        let args = CliArgs::try_parse_from(core::iter::once("numgen").chain(args.iter().copied()))?;
        PoolConfig::try_from(args)
    }

    #[test]
    fn parses_required_flags() {
        let config = parse(&["--flowcount", "3", "--limit", "10", "--timeout", "5"]).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.ceiling, 10);
        assert_eq!(config.interval, Duration::from_millis(5));
        assert_eq!(config.value_buffer, 3);
        assert_eq!(config.reply_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn optional_flags_override_defaults() {
        let config = parse(&[
            "--flowcount",
            "2",
            "--limit",
            "10",
            "--timeout",
            "1",
            "--buffer",
            "16",
            "--reply-timeout",
            "0",
        ])
        .unwrap();
        assert_eq!(config.value_buffer, 16);
        assert_eq!(config.reply_timeout, None);
    }

    #[test]
    fn rejects_zero_values() {
        assert!(parse(&["--flowcount", "0", "--limit", "10", "--timeout", "5"]).is_err());
        assert!(parse(&["--flowcount", "1", "--limit", "0", "--timeout", "5"]).is_err());
        assert!(parse(&["--flowcount", "1", "--limit", "10", "--timeout", "0"]).is_err());
        assert!(
            parse(&["--flowcount", "1", "--limit", "10", "--timeout", "5", "--buffer", "0"])
                .is_err()
        );
    }

    #[test]
    fn rejects_missing_flags() {
        assert!(parse(&["--flowcount", "1", "--limit", "10"]).is_err());
    }
}
