use crate::gate::{csrf::DEFAULT_COOKIE_MAX_AGE_SECONDS, GateConfig, DEFAULT_PUBLIC_BASE_URL};
use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_ADMIN_EMAILS: &str = "admin-emails";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_CSRF_COOKIE_MAX_AGE_SECONDS: &str = "csrf-cookie-max-age-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub admin_emails: String,
    pub public_base_url: String,
    pub csrf_cookie_max_age_seconds: u64,
}

impl Options {
    /// Parse gate arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is missing or the cookie
    /// lifetime is zero.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let public_base_url = matches
            .get_one::<String>(ARG_PUBLIC_BASE_URL)
            .cloned()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_PUBLIC_BASE_URL}"))?;

        let csrf_cookie_max_age_seconds = matches
            .get_one::<u64>(ARG_CSRF_COOKIE_MAX_AGE_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_COOKIE_MAX_AGE_SECONDS);
        if csrf_cookie_max_age_seconds == 0 {
            return Err(anyhow!(
                "--{ARG_CSRF_COOKIE_MAX_AGE_SECONDS} must be greater than zero"
            ));
        }

        Ok(Self {
            admin_emails: matches
                .get_one::<String>(ARG_ADMIN_EMAILS)
                .cloned()
                .unwrap_or_default(),
            public_base_url,
            csrf_cookie_max_age_seconds,
        })
    }

    #[must_use]
    pub fn into_config(self) -> GateConfig {
        GateConfig::new(self.admin_emails)
            .with_public_base_url(self.public_base_url)
            .with_csrf_cookie_max_age_seconds(self.csrf_cookie_max_age_seconds)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_EMAILS)
                .long(ARG_ADMIN_EMAILS)
                .help("Comma-separated admin email addresses (empty: nobody is admin)")
                .env("LEARNFLOW_ADMIN_EMAILS")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public base URL; https enables Secure cookies")
                .env("LEARNFLOW_PUBLIC_BASE_URL")
                .default_value(DEFAULT_PUBLIC_BASE_URL),
        )
        .arg(
            Arg::new(ARG_CSRF_COOKIE_MAX_AGE_SECONDS)
                .long(ARG_CSRF_COOKIE_MAX_AGE_SECONDS)
                .help("Lifetime of the CSRF cookie in seconds")
                .env("LEARNFLOW_CSRF_COOKIE_MAX_AGE_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
}
