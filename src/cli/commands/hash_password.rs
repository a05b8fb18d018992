use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const CMD_HASH_PASSWORD: &str = "hash-password";
pub const ARG_PASSWORD: &str = "password";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_HASH_PASSWORD)
        .about("Derive the stored hash and salt for a password")
        .arg(
            Arg::new(ARG_PASSWORD)
                .help("Password to hash")
                .env("CREDENCE_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

/// Read the password from `hash-password` matches.
///
/// # Errors
/// Returns an error if the password is missing or empty.
pub fn password(matches: &ArgMatches) -> anyhow::Result<SecretString> {
    matches
        .get_one::<String>(ARG_PASSWORD)
        .filter(|v| !v.is_empty())
        .cloned()
        .map(SecretString::from)
        .ok_or_else(|| anyhow::anyhow!("missing required argument: <{ARG_PASSWORD}>"))
}
