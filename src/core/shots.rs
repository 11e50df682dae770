// src/core/shots.rs

use super::error::{InterpError, Result, UnsupportedFeature};
use std::fmt;
use std::num::NonZeroU64;

/// Shot configuration as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ShotConfig {
    /// Exact statistics, no sampling.
    #[default]
    None,
    /// A single batch of this many shots.
    Total(u64),
    /// A shot vector. Recognised so it can be rejected explicitly.
    Partitioned(Vec<u64>),
}

impl From<u64> for ShotConfig {
    fn from(shots: u64) -> Self {
        ShotConfig::Total(shots)
    }
}

impl From<Option<u64>> for ShotConfig {
    fn from(shots: Option<u64>) -> Self {
        shots.map_or(ShotConfig::None, ShotConfig::Total)
    }
}

/// Validated shot setting used during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shots {
    /// Statistics are computed exactly from the state.
    Analytic,
    /// Statistics are estimated from this many samples.
    Finite(NonZeroU64),
}

impl Shots {
    /// Validates a [`ShotConfig`].
    ///
    /// # Errors
    /// * `Unsupported(PartitionedShots)` for shot vectors.
    /// * `InvalidConfig` for a total of zero shots.
    pub fn from_config(config: &ShotConfig) -> Result<Self> {
        match config {
            ShotConfig::None => Ok(Shots::Analytic),
            ShotConfig::Total(total) => NonZeroU64::new(*total)
                .map(Shots::Finite)
                .ok_or_else(|| InterpError::InvalidConfig {
                    message: "shot count must be positive".to_string(),
                }),
            ShotConfig::Partitioned(_) => Err(InterpError::Unsupported(UnsupportedFeature::PartitionedShots)),
        }
    }

    /// True when no sampling is performed.
    pub fn is_analytic(&self) -> bool {
        matches!(self, Shots::Analytic)
    }
}

impl fmt::Display for Shots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shots::Analytic => write!(f, "analytic"),
            Shots::Finite(n) => write!(f, "{} shots", n),
        }
    }
}
