use crate::{api, auth::AntiforgeryGate, storage};
use anyhow::{Context, Result};
use chrono::Duration;
use secrecy::SecretString;
use tracing::{debug, warn};

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub antiforgery_key: Option<SecretString>,
    pub antiforgery_ttl_seconds: i64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database cannot be opened, the anti-forgery key is
/// invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let ttl = Duration::seconds(args.antiforgery_ttl_seconds);
    let gate = match &args.antiforgery_key {
        Some(key) => AntiforgeryGate::from_base64_key(key, ttl)
            .context("invalid CREDENCE_ANTIFORGERY_KEY")?,
        None => {
            warn!("no anti-forgery key configured; generated one for this process");
            AntiforgeryGate::generate(ttl)?
        }
    };

    let pool = storage::connect(&args.dsn, MAX_CONNECTIONS).await?;
    debug!("database ready");

    let config = api::AuthConfig::new().with_cookie_secure(args.cookie_secure);

    api::new(args.port, pool, gate, config).await
}
