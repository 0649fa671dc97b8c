//! Library-level configuration.
//!
//! This struct is the whole configuration surface of the pipeline: the
//! credential for the classification capability and the two pacing knobs.
//! Binaries map CLI flags and environment variables onto it; the library
//! never reads the environment on its own except through [`Config::from_env`].

use serde::{Deserialize, Serialize};

/// Default capability model id.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Pipeline configuration.
///
/// The pacing defaults are deliberately conservative: they suit small
/// rate-limited hosting, and callers with more headroom can lower them to
/// zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credential for the classification capability.
    pub api_key: Option<String>,

    /// Capability model id.
    pub model: String,

    /// Delay between internal processing chunks, in seconds.
    pub chunk_delay_secs: u64,

    /// Cooldown between consecutive full pipeline runs, in seconds.
    pub run_cooldown_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            chunk_delay_secs: 1,
            run_cooldown_secs: 5,
        }
    }
}

impl Config {
    /// Build a config from the process environment.
    ///
    /// Reads `ANTHROPIC_API_KEY`, `GALLEY_MODEL`, `GALLEY_CHUNK_DELAY_SECS`
    /// and `GALLEY_RUN_COOLDOWN_SECS`; anything missing or unparsable keeps
    /// its default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            model: std::env::var("GALLEY_MODEL").unwrap_or(defaults.model),
            chunk_delay_secs: env_u64("GALLEY_CHUNK_DELAY_SECS", defaults.chunk_delay_secs),
            run_cooldown_secs: env_u64("GALLEY_RUN_COOLDOWN_SECS", defaults.run_cooldown_secs),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
