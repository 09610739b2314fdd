//! Configuration for spv-proof
//!
//! Settings can be built programmatically, parsed from JSON, or layered over
//! the defaults from `SPV_PROOF_<KEY>` environment variables. Nothing in the
//! library reads the environment on its own.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::chain::ChainOptions;
use crate::constants::{DIFFICULTY_ONE_BITS, RETARGET_PERIOD};
use crate::error::{Result, SpvError};
use crate::pow::expand_target;

/// How output classification treats scripts that match no known template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Fail with `UnrecognizedOutputType`
    #[default]
    Strict,
    /// Report the output as `Nonstandard`
    Permissive,
}

impl std::str::FromStr for OutputPolicy {
    type Err = SpvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(OutputPolicy::Strict),
            "permissive" => Ok(OutputPolicy::Permissive),
            other => Err(SpvError::Config(format!("unknown output policy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpvConfig {
    #[serde(default)]
    pub output_policy: OutputPolicy,

    /// Maximum headers per chain validation call; 0 disables the bound
    /// Default: 2016 (one retarget period)
    #[serde(default = "default_max_header_chain_length")]
    pub max_header_chain_length: usize,

    /// Compact difficulty-1 target used for difficulty scoring
    /// Default: 0x1d00ffff
    #[serde(default = "default_difficulty_one_bits")]
    pub difficulty_one_bits: u32,

    /// Expected seconds per retarget period
    /// Default: 1209600 (2016 blocks of 10 minutes)
    #[serde(default = "default_retarget_period_secs")]
    pub retarget_period_secs: u64,

    /// Hash headers in parallel (requires the `rayon` feature)
    #[serde(default = "default_true")]
    pub parallel_digests: bool,
}

fn default_max_header_chain_length() -> usize {
    2016
}

fn default_difficulty_one_bits() -> u32 {
    DIFFICULTY_ONE_BITS
}

fn default_retarget_period_secs() -> u64 {
    RETARGET_PERIOD
}

fn default_true() -> bool {
    true
}

impl Default for SpvConfig {
    fn default() -> Self {
        Self {
            output_policy: OutputPolicy::Strict,
            max_header_chain_length: default_max_header_chain_length(),
            difficulty_one_bits: DIFFICULTY_ONE_BITS,
            retarget_period_secs: RETARGET_PERIOD,
            parallel_digests: true,
        }
    }
}

impl SpvConfig {
    /// Load configuration from environment variables
    ///
    /// Variables follow the pattern `SPV_PROOF_<KEY>`, for example
    /// `SPV_PROOF_OUTPUT_POLICY=permissive` or `SPV_PROOF_MAX_HEADER_CHAIN_LENGTH=500`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SPV_PROOF_OUTPUT_POLICY") {
            if let Ok(policy) = val.parse::<OutputPolicy>() {
                config.output_policy = policy;
            }
        }
        if let Ok(val) = std::env::var("SPV_PROOF_MAX_HEADER_CHAIN_LENGTH") {
            if let Ok(max) = val.parse::<usize>() {
                config.max_header_chain_length = max;
            }
        }
        if let Ok(val) = std::env::var("SPV_PROOF_DIFFICULTY_ONE_BITS") {
            let digits = val.trim_start_matches("0x");
            if let Ok(bits) = u32::from_str_radix(digits, 16) {
                config.difficulty_one_bits = bits;
            }
        }
        if let Ok(val) = std::env::var("SPV_PROOF_RETARGET_PERIOD_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.retarget_period_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("SPV_PROOF_PARALLEL_DIGESTS") {
            if let Ok(enabled) = val.parse::<bool>() {
                config.parallel_digests = enabled;
            }
        }

        config
    }

    /// Parse and validate a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SpvConfig =
            serde_json::from_str(json).map_err(|e| SpvError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Rejects settings no computation could use
    pub fn validate(&self) -> Result<()> {
        let target = expand_target(self.difficulty_one_bits)
            .map_err(|_| SpvError::Config(format!("difficulty_one_bits 0x{:08x} overflows", self.difficulty_one_bits)))?;
        if target.is_zero() {
            return Err(SpvError::Config("difficulty_one_bits expands to a zero target".into()));
        }
        if self.retarget_period_secs < 4 {
            return Err(SpvError::Config(format!(
                "retarget_period_secs {} is too short",
                self.retarget_period_secs
            )));
        }
        Ok(())
    }

    pub fn chain_options(&self) -> ChainOptions {
        ChainOptions {
            max_headers: self.max_header_chain_length,
            difficulty_one_bits: self.difficulty_one_bits,
            parallel_digests: self.parallel_digests,
        }
    }
}
