use crate::{
    api,
    auth::{AuthConfig, rate_limit::FixedWindowRateLimiter},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub origin: Option<String>,
    pub signing_key: String,
    pub issuer: String,
    pub access_token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub lockout_threshold: u32,
    pub lockout_cooldown_seconds: i64,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub rate_limit_attempts: u32,
    pub rate_limit_window_seconds: u64,
    pub purge_interval_seconds: u64,
    pub stats_interval_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is malformed or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    // Parse eagerly so a malformed DSN fails before any socket is bound
    let dsn = Url::parse(&args.dsn).context("Invalid database connection string")?;

    let auth_config = AuthConfig::new(SecretString::from(args.signing_key))
        .with_issuer(args.issuer)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_lockout_threshold(args.lockout_threshold)
        .with_lockout_cooldown_seconds(args.lockout_cooldown_seconds)
        .with_hash_memory_kib(args.hash_memory_kib)
        .with_hash_iterations(args.hash_iterations);

    let maintenance_config = api::maintenance::MaintenanceConfig::new()
        .with_purge_interval_seconds(args.purge_interval_seconds)
        .with_stats_interval_seconds(args.stats_interval_seconds);

    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
        args.rate_limit_attempts,
        Duration::from_secs(args.rate_limit_window_seconds),
    ));

    api::new(
        args.port,
        dsn.to_string(),
        args.origin,
        auth_config,
        maintenance_config,
        rate_limiter,
    )
    .await
}
