//! Tracing subscriber setup, driven by `DEBUG`/`EXT_DEBUG` (`spec.md` §6,
//! `SPEC_FULL.md` §10.1).
//!
//! `RUST_LOG`, when set, always wins. Otherwise the verbosity flags select a
//! default filter directive: neither set → `info`; `DEBUG` → gateway crates
//! at `debug`, everything else at `info`; `EXT_DEBUG` → `debug` everywhere,
//! including transport internals.

use tracing_subscriber::EnvFilter;

/// Verbosity requested through the `DEBUG`/`EXT_DEBUG` environment flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Default: `info` and above.
    #[default]
    Normal,
    /// `DEBUG=true`: gateway crates at `debug`, dependencies at `info`.
    Debug,
    /// `EXT_DEBUG=true`: `debug` everywhere.
    ExtDebug,
}

impl Verbosity {
    /// Derives a [`Verbosity`] from the two boolean flags in `AppConfig`.
    #[must_use]
    pub const fn from_flags(debug: bool, ext_debug: bool) -> Self {
        if ext_debug {
            Self::ExtDebug
        } else if debug {
            Self::Debug
        } else {
            Self::Normal
        }
    }

    fn default_directive(self) -> &'static str {
        match self {
            Self::Normal => "info",
            Self::Debug => "gateway=debug,gwcore=debug,senders=debug,transfer=debug,cache=debug,dispatcher=debug,http=debug,info",
            Self::ExtDebug => "debug",
        }
    }
}

/// Installs a global `tracing` subscriber writing to stderr.
///
/// Call once, as early as possible in `main`. Returns an error if a global
/// subscriber was already installed (double-init is a programming error, not
/// a runtime condition worth modeling as part of `GatewayError`).
pub fn init(verbosity: Verbosity) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_debug_wins_over_debug() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::ExtDebug);
    }

    #[test]
    fn neither_flag_is_normal() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn debug_alone_is_debug() {
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Debug);
    }
}
