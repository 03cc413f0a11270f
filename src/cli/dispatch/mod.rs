//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{security, tokens};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let origin = matches.get_one::<String>("origin").cloned();

    // Reject signing keys clap accepted but the token signer cannot use
    crate::cli::commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let token_opts = tokens::Options::parse(matches)?;
    let security_opts = security::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        origin,
        signing_key: token_opts.signing_key,
        issuer: token_opts.issuer,
        access_token_ttl_seconds: token_opts.access_token_ttl_seconds,
        session_ttl_seconds: token_opts.session_ttl_seconds,
        lockout_threshold: security_opts.lockout_threshold,
        lockout_cooldown_seconds: security_opts.lockout_cooldown_seconds,
        hash_memory_kib: security_opts.hash_memory_kib,
        hash_iterations: security_opts.hash_iterations,
        rate_limit_attempts: security_opts.rate_limit_attempts,
        rate_limit_window_seconds: security_opts.rate_limit_window_seconds,
        purge_interval_seconds: security_opts.purge_interval_seconds,
        stats_interval_seconds: security_opts.stats_interval_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_signing_key_rejected() {
        temp_env::with_vars(
            [
                (
                    "NOVASANCTUM_DSN",
                    Some("postgres://user@localhost:5432/novasanctum"),
                ),
                ("NOVASANCTUM_SIGNING_KEY", Some("short")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["novasanctum"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("at least 32 bytes"));
                }
            },
        );
    }

    #[test]
    fn server_action_carries_arguments() {
        temp_env::with_vars(
            [
                (
                    "NOVASANCTUM_DSN",
                    Some("postgres://user@localhost:5432/novasanctum"),
                ),
                (
                    "NOVASANCTUM_SIGNING_KEY",
                    Some("0123456789abcdef0123456789abcdef"),
                ),
                ("NOVASANCTUM_PORT", Some("9090")),
                ("NOVASANCTUM_ORIGIN", Some("https://console.example.com")),
                ("NOVASANCTUM_ACCESS_TOKEN_TTL_SECONDS", Some("120")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["novasanctum"]);
                let Action::Server(args) = handler(&matches).expect("handler should succeed");
                assert_eq!(args.port, 9090);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/novasanctum");
                assert_eq!(args.origin.as_deref(), Some("https://console.example.com"));
                assert_eq!(args.access_token_ttl_seconds, 120);
                assert_eq!(args.session_ttl_seconds, 86400);
                assert_eq!(args.lockout_threshold, 5);
                assert_eq!(args.purge_interval_seconds, 3600);
            },
        );
    }
}
