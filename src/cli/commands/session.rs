use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_ANTIFORGERY_KEY: &str = "antiforgery-key";
pub const ARG_ANTIFORGERY_TTL_SECONDS: &str = "antiforgery-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub antiforgery_key: Option<SecretString>,
    pub antiforgery_ttl_seconds: i64,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse session and anti-forgery arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the token TTL is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let antiforgery_ttl_seconds = matches
            .get_one::<i64>(ARG_ANTIFORGERY_TTL_SECONDS)
            .copied()
            .ok_or_else(|| {
                anyhow::anyhow!("missing required argument: --{ARG_ANTIFORGERY_TTL_SECONDS}")
            })?;

        // An empty env var means "not configured".
        let antiforgery_key = matches
            .get_one::<String>(ARG_ANTIFORGERY_KEY)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .map(SecretString::from);

        Ok(Self {
            antiforgery_key,
            antiforgery_ttl_seconds,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ANTIFORGERY_KEY)
                .long(ARG_ANTIFORGERY_KEY)
                .help("Base64 encoded 32-byte key for anti-forgery tokens")
                .long_help(
                    "Base64 encoded 32-byte key used to sign anti-forgery request tokens.\n\nWhen unset a random key is generated at startup, so forms rendered before a restart stop validating.",
                )
                .env("CREDENCE_ANTIFORGERY_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ANTIFORGERY_TTL_SECONDS)
                .long(ARG_ANTIFORGERY_TTL_SECONDS)
                .help("Anti-forgery request token TTL in seconds")
                .env("CREDENCE_ANTIFORGERY_TTL_SECONDS")
                .default_value("7200")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark cookies Secure (serve over HTTPS)")
                .env("CREDENCE_COOKIE_SECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}
