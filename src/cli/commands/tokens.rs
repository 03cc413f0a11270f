use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_SIGNING_KEY: &str = "signing-key";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";

/// Token issuance options resolved from CLI matches.
#[derive(Debug)]
pub struct Options {
    pub signing_key: String,
    pub issuer: String,
    pub access_token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            signing_key: matches
                .get_one::<String>(ARG_SIGNING_KEY)
                .cloned()
                .context("missing required argument: --signing-key")?,
            issuer: matches
                .get_one::<String>(ARG_ISSUER)
                .cloned()
                .context("missing required argument: --issuer")?,
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL)
                .copied()
                .context("missing required argument: --access-token-ttl-seconds")?,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
        })
    }
}

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_KEY)
                .long("signing-key")
                .help("HMAC key for signing access tokens (min 32 bytes)")
                .env("NOVASANCTUM_SIGNING_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long("issuer")
                .help("Issuer claim stamped into access tokens")
                .env("NOVASANCTUM_ISSUER")
                .default_value("novasanctum"),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long("access-token-ttl-seconds")
                .help("Access token lifetime in seconds")
                .env("NOVASANCTUM_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long("session-ttl-seconds")
                .help("Refresh session lifetime in seconds")
                .env("NOVASANCTUM_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
}
