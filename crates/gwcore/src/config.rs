//! Environment-sourced configuration (`spec.md` §6, expanded in
//! `SPEC_FULL.md` §10.3).
//!
//! [`AppConfig::from_env`] is the only place the gateway reads `std::env`.
//! It fails closed: any required variable that is missing or unparsable
//! produces a [`ConfigError`] before a single client connects.

use std::env::{self, VarError};
use std::net::{AddrParseError, SocketAddr};

use crate::constants::{
    DEFAULT_CACHE_SIZE, DEFAULT_CONNECTION_LIMIT, DEFAULT_DOWNLOAD_PART_SIZE, DEFAULT_HOST,
    DEFAULT_PORT,
};

/// Failure parsing the environment into an [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable was not set.
    #[error("missing required environment variable {name}")]
    Missing {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// A variable was set but could not be parsed as the expected type.
    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    Invalid {
        /// Name of the offending variable.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
        /// Human-readable parse failure.
        reason: String,
    },
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Err(ConfigError::Missing { name }),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            name,
            value: String::from("<non-unicode>"),
            reason: "value is not valid UTF-8".to_string(),
        }),
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok()
}

fn parse_required<T: std::str::FromStr>(name: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let raw = require(name)?;
    raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
        name,
        value: raw,
        reason: err.to_string(),
    })
}

fn parse_optional<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
            name,
            value: raw,
            reason: err.to_string(),
        }),
    }
}

fn truthy(raw: &str) -> bool {
    !raw.is_empty() && !raw.eq_ignore_ascii_case("false") && raw != "0"
}

/// Scans `std::env::vars()` for `MULTI_TOKEN{N}` keys, parses the numeric
/// suffix, and returns the tokens ordered by ascending `N` (`spec.md` §6).
fn multi_client_tokens() -> Vec<String> {
    const PREFIX: &str = "MULTI_TOKEN";
    let mut ordered: Vec<(u32, String)> = env::vars()
        .filter_map(|(key, value)| {
            let suffix = key.strip_prefix(PREFIX)?;
            suffix.parse::<u32>().ok().map(|n| (n, value))
        })
        .collect();
    ordered.sort_by_key(|(n, _)| *n);
    ordered.into_iter().map(|(_, token)| token).collect()
}

/// Typed, validated form of the environment table in `spec.md` §6.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Remote-network application id (`API_ID`).
    pub api_id: i32,
    /// Remote-network application hash (`API_HASH`).
    pub api_hash: String,
    /// Main bot token (`BOT_TOKEN`).
    pub bot_token: String,
    /// Archive channel numeric id (`BIN_CHANNEL`).
    pub bin_channel: i64,
    /// HTTP bind address, combining `HOST` and `PORT`.
    pub bind_addr: SocketAddr,
    /// URL the bot announces to users (`PUBLIC_URL`).
    pub public_url: String,
    /// Max senders per DC per client (`CONNECTION_LIMIT`).
    pub connection_limit: usize,
    /// Aligned chunk size in bytes (`DOWNLOAD_PART_SIZE`).
    pub download_part_size: u32,
    /// LRU capacity for resolved `FileInfo` (`CACHE_SIZE`).
    pub cache_size: usize,
    /// Extra bot tokens from `MULTI_TOKEN{N}`, ordered by `N`.
    pub multi_tokens: Vec<String>,
    /// Skip plugin loading (`NO_UPDATE`).
    pub no_update: bool,
    /// Verbose logging (`DEBUG`).
    pub debug: bool,
    /// Extra-verbose logging, including transport internals (`EXT_DEBUG`).
    pub ext_debug: bool,
}

impl AppConfig {
    /// Loads a `.env` file if present (best-effort, process environment
    /// always wins) and parses the table from `std::env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_id = parse_required::<i32>("API_ID")?;
        let api_hash = require("API_HASH")?;
        let bot_token = require("BOT_TOKEN")?;
        let bin_channel = parse_required::<i64>("BIN_CHANNEL")?;

        let host = optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_optional::<u16>("PORT", DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|err: AddrParseError| ConfigError::Invalid {
                name: "HOST/PORT",
                value: format!("{host}:{port}"),
                reason: err.to_string(),
            })?;

        let public_url =
            optional("PUBLIC_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        let connection_limit =
            parse_optional::<usize>("CONNECTION_LIMIT", DEFAULT_CONNECTION_LIMIT)?;
        let download_part_size =
            parse_optional::<u32>("DOWNLOAD_PART_SIZE", DEFAULT_DOWNLOAD_PART_SIZE)?;
        let cache_size = parse_optional::<usize>("CACHE_SIZE", DEFAULT_CACHE_SIZE)?;

        let no_update = optional("NO_UPDATE").is_some_and(|raw| truthy(&raw));
        let debug = optional("DEBUG").is_some_and(|raw| truthy(&raw));
        let ext_debug = optional("EXT_DEBUG").is_some_and(|raw| truthy(&raw));

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            bin_channel,
            bind_addr,
            public_url,
            connection_limit,
            download_part_size,
            cache_size,
            multi_tokens: multi_client_tokens(),
            no_update,
            debug,
            ext_debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_common_spellings() {
        assert!(truthy("true"));
        assert!(truthy("1"));
        assert!(truthy("yes"));
        assert!(!truthy("false"));
        assert!(!truthy("0"));
        assert!(!truthy(""));
    }

    #[test]
    fn multi_client_tokens_orders_by_suffix() {
        // SAFETY-free: env mutation in tests is inherently racy across the
        // process, so this test only exercises the pure parsing path.
        let pairs = [("MULTI_TOKEN2", "b"), ("MULTI_TOKEN1", "a")];
        let mut ordered: Vec<(u32, &str)> = pairs
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix("MULTI_TOKEN")
                    .and_then(|n| n.parse::<u32>().ok())
                    .map(|n| (n, *v))
            })
            .collect();
        ordered.sort_by_key(|(n, _)| *n);
        assert_eq!(
            ordered.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn missing_required_reports_name() {
        let err = require("TGFS_DEFINITELY_UNSET_VAR_XYZ").unwrap_err();
        match err {
            ConfigError::Missing { name } => assert_eq!(name, "TGFS_DEFINITELY_UNSET_VAR_XYZ"),
            other => panic!("expected Missing, got {other:?}"),
        }
    }
}
