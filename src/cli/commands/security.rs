use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_LOCKOUT_THRESHOLD: &str = "lockout-threshold";
pub const ARG_LOCKOUT_COOLDOWN: &str = "lockout-cooldown-seconds";
pub const ARG_HASH_MEMORY_KIB: &str = "hash-memory-kib";
pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_RATE_LIMIT_ATTEMPTS: &str = "rate-limit-attempts";
pub const ARG_RATE_LIMIT_WINDOW: &str = "rate-limit-window-seconds";
pub const ARG_PURGE_INTERVAL: &str = "purge-interval-seconds";
pub const ARG_STATS_INTERVAL: &str = "stats-interval-seconds";

/// Lockout, hashing, rate-limit, and maintenance options.
#[derive(Debug)]
pub struct Options {
    pub lockout_threshold: u32,
    pub lockout_cooldown_seconds: i64,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub rate_limit_attempts: u32,
    pub rate_limit_window_seconds: u64,
    pub purge_interval_seconds: u64,
    pub stats_interval_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            lockout_threshold: matches
                .get_one::<u32>(ARG_LOCKOUT_THRESHOLD)
                .copied()
                .context("missing required argument: --lockout-threshold")?,
            lockout_cooldown_seconds: matches
                .get_one::<i64>(ARG_LOCKOUT_COOLDOWN)
                .copied()
                .context("missing required argument: --lockout-cooldown-seconds")?,
            hash_memory_kib: matches
                .get_one::<u32>(ARG_HASH_MEMORY_KIB)
                .copied()
                .context("missing required argument: --hash-memory-kib")?,
            hash_iterations: matches
                .get_one::<u32>(ARG_HASH_ITERATIONS)
                .copied()
                .context("missing required argument: --hash-iterations")?,
            rate_limit_attempts: matches
                .get_one::<u32>(ARG_RATE_LIMIT_ATTEMPTS)
                .copied()
                .context("missing required argument: --rate-limit-attempts")?,
            rate_limit_window_seconds: matches
                .get_one::<u64>(ARG_RATE_LIMIT_WINDOW)
                .copied()
                .context("missing required argument: --rate-limit-window-seconds")?,
            purge_interval_seconds: matches
                .get_one::<u64>(ARG_PURGE_INTERVAL)
                .copied()
                .context("missing required argument: --purge-interval-seconds")?,
            stats_interval_seconds: matches
                .get_one::<u64>(ARG_STATS_INTERVAL)
                .copied()
                .context("missing required argument: --stats-interval-seconds")?,
        })
    }
}

pub fn with_args(command: Command) -> Command {
    let command = with_lockout_args(command);
    let command = with_hashing_args(command);
    let command = with_rate_limit_args(command);
    with_maintenance_args(command)
}

fn with_lockout_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOCKOUT_THRESHOLD)
                .long("lockout-threshold")
                .help("Consecutive failed logins before an account locks")
                .env("NOVASANCTUM_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_COOLDOWN)
                .long("lockout-cooldown-seconds")
                .help("How long a locked account stays locked")
                .env("NOVASANCTUM_LOCKOUT_COOLDOWN_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_hashing_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_MEMORY_KIB)
                .long("hash-memory-kib")
                .help("Argon2 memory cost in KiB")
                .env("NOVASANCTUM_HASH_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long("hash-iterations")
                .help("Argon2 time cost (iterations)")
                .env("NOVASANCTUM_HASH_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
}

fn with_rate_limit_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RATE_LIMIT_ATTEMPTS)
                .long("rate-limit-attempts")
                .help("Allowed auth attempts per client IP per window")
                .env("NOVASANCTUM_RATE_LIMIT_ATTEMPTS")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW)
                .long("rate-limit-window-seconds")
                .help("Rate limit window length in seconds")
                .env("NOVASANCTUM_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_maintenance_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PURGE_INTERVAL)
                .long("purge-interval-seconds")
                .help("Expired session purge interval in seconds")
                .env("NOVASANCTUM_PURGE_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_STATS_INTERVAL)
                .long("stats-interval-seconds")
                .help("Audit activity summary interval in seconds")
                .env("NOVASANCTUM_STATS_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}
