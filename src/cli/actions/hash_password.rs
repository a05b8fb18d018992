use crate::auth::CredentialHasher;
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct Args {
    pub password: SecretString,
}

/// Print a fresh hash and salt as JSON, ready to be stored on a user row.
/// # Errors
/// Returns an error if the OS random source fails.
pub fn execute(args: &Args) -> Result<()> {
    let derived = CredentialHasher::new().derive(args.password.expose_secret(), None)?;
    let output = serde_json::json!({
        "password": derived.hash,
        "salt": derived.salt,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
