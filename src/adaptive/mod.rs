//! Adaptive stage 1 calling.
//!
//! When no hit survives the configured thresholds, a sample with a strong
//! best hit gets one more pass at a relaxed percent threshold; otherwise it
//! falls back to an acapsular or no-hits advisory.

pub mod classifier;

pub use classifier::{
    format_phenotype_set, Category, ClassificationError, ClassificationResult, GroupResolver,
};

use serde::{Deserialize, Serialize};

/// Thresholds governing the retry and fallback decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Both the best hit and the configured minpercent must reach this to retry
    pub retry_min_percent: f64,
    /// Best hits below this are reported as possibly acapsular
    pub acapsular_max_percent: f64,
    /// Fraction of the best hit's percent removed to get the relaxed threshold
    pub relaxation_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retry_min_percent: 70.0,
            acapsular_max_percent: 20.0,
            relaxation_fraction: 0.1,
        }
    }
}

/// What to do with a sample whose filtered hit set came back empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// Refilter at this minpercent
    Retry(f64),
    /// Acapsular or no-hits advisory
    NoCall(ClassificationResult),
}

impl RetryPolicy {
    pub fn should_retry(&self, max_percent: f64, minpercent: f64) -> bool {
        max_percent >= self.retry_min_percent && minpercent >= self.retry_min_percent
    }

    /// Best hit percent minus `relaxation_fraction` of itself.
    pub fn relaxed_threshold(&self, max_percent: f64) -> f64 {
        max_percent - max_percent * self.relaxation_fraction
    }

    /// Decision for an empty first pass.
    pub fn on_empty(&self, max_percent: f64, minpercent: f64) -> Fallback {
        if self.should_retry(max_percent, minpercent) {
            Fallback::Retry(self.relaxed_threshold(max_percent))
        } else {
            Fallback::NoCall(self.no_call(max_percent))
        }
    }

    /// Acapsular or no-hits advisory, ignoring the retry option.
    pub fn no_call(&self, max_percent: f64) -> ClassificationResult {
        if max_percent < self.acapsular_max_percent {
            ClassificationResult::advisory(
                Category::Acapsular,
                format!(
                    "Below {}% hit - possible acapsular organism, check species identity \
                     and sequence quality.",
                    self.acapsular_max_percent
                ),
            )
        } else {
            ClassificationResult::advisory(
                Category::NoHits,
                format!(
                    "Below {}% hit - Poor Sequence quality, variant or non-typeable organism.",
                    self.retry_min_percent
                ),
            )
        }
    }
}
