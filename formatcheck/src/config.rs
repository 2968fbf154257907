//! Runtime mode configuration.
//!
//! The mode is set via the `FORMATCHECK_MODE` environment variable, read
//! once on the first intercepted call. Case and surrounding whitespace are
//! ignored.
//! - `report` (default; also `all`, `default`): report writable format
//!   strings and addresses that couldn't be classified.
//! - `writable` (also `quiet`, `attention`): report writable format strings
//!   only.
//! - `off` (also `none`, `disabled`): no checks at all. The hooks only
//!   delegate.
//!
//! Anything else, or an unset variable, means `report`.

use std::sync::OnceLock;

use crate::maps::Classification;

const MODE_VAR: &str = "FORMATCHECK_MODE";

/// What the hooks check and report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Report `Writable` and `Unknown` classifications.
    #[default]
    Report,
    /// Report `Writable` classifications only.
    WritableOnly,
    /// Skip classification entirely.
    Off,
}

impl Mode {
    /// Parse from string (case-insensitive). Unrecognized values fall back
    /// to the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" | "all" | "default" => Self::Report,
            "writable" | "quiet" | "attention" => Self::WritableOnly,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Report,
        }
    }

    /// The mode for a `FORMATCHECK_MODE` value, or its absence.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        value.map(Self::from_str_loose).unwrap_or_default()
    }

    /// Whether format strings get classified at all.
    #[must_use]
    pub const fn checks_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Whether a classification gets reported in this mode.
    #[must_use]
    pub const fn reports(self, classification: Classification) -> bool {
        match (self, classification) {
            (Self::Off, _) | (_, Classification::NotWritable) => false,
            (Self::WritableOnly, Classification::Unknown) => false,
            _ => true,
        }
    }
}

static MODE: OnceLock<Mode> = OnceLock::new();

/// Get the configured mode. The environment is read once, on first use.
#[must_use]
pub fn mode() -> Mode {
    *MODE.get_or_init(|| Mode::from_env_value(std::env::var(MODE_VAR).ok().as_deref()))
}
