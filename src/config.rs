//! Run configuration: hit thresholds and the retry policy.

use crate::adaptive::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Thresholds a hit must reach to count as a top hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub minpercent: f64,
    pub minmulti: u32,
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams {
            minpercent: 90.0,
            minmulti: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage1Config {
    pub filter: FilterParams,
    pub retry: RetryPolicy,
}

impl Stage1Config {
    /// Loads a JSON config; missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let config: Stage1Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(
        mut self,
        minpercent: Option<f64>,
        minmulti: Option<u32>,
    ) -> Result<Self> {
        if let Some(minpercent) = minpercent {
            self.filter.minpercent = minpercent;
        }
        if let Some(minmulti) = minmulti {
            self.filter.minmulti = minmulti;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.filter.minpercent) {
            anyhow::bail!(
                "minpercent must be between 0 and 100, got {}",
                self.filter.minpercent
            );
        }
        let retry = &self.retry;
        if !(0.0..=100.0).contains(&retry.retry_min_percent)
            || !(0.0..=100.0).contains(&retry.acapsular_max_percent)
        {
            anyhow::bail!(
                "retry gates must be between 0 and 100, got {} and {}",
                retry.retry_min_percent,
                retry.acapsular_max_percent
            );
        }
        if retry.acapsular_max_percent > retry.retry_min_percent {
            anyhow::bail!(
                "acapsular_max_percent ({}) must not exceed retry_min_percent ({})",
                retry.acapsular_max_percent,
                retry.retry_min_percent
            );
        }
        if !(0.0..1.0).contains(&retry.relaxation_fraction) {
            anyhow::bail!(
                "relaxation_fraction must be in [0, 1), got {}",
                retry.relaxation_fraction
            );
        }
        Ok(())
    }
}
