//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action: either serving the sign-in
//! endpoints or deriving a stored credential for an operator.

use crate::cli::actions::{hash_password, server, Action};
use crate::cli::commands::{self, session};
use anyhow::{Context, Result};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(commands::hash_password::CMD_HASH_PASSWORD) {
        let password = commands::hash_password::password(sub)?;
        return Ok(Action::HashPassword(hash_password::Args { password }));
    }

    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .filter(|v| !v.trim().is_empty())
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn,
        antiforgery_key: session_opts.antiforgery_key,
        antiforgery_ttl_seconds: session_opts.antiforgery_ttl_seconds,
        cookie_secure: session_opts.cookie_secure,
    }))
}
