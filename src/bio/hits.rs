//! Screening hits and threshold filtering.
//!
//! A sample's Mash screen output is held as a [`HitTable`]. Filtering
//! splits it into the hits that pass the percent/multiplicity thresholds
//! ("top hits") while keeping the original rows for the audit report.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of screening output for a single reference serotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    /// Reference serotype identifier (query-ID stem)
    pub serotype_hit: String,
    /// Percent of reference hashes contained in the sample (0-100)
    pub percent: f64,
    /// Sequence identity (0-100)
    pub identity: f64,
    /// Median multiplicity of shared hashes
    pub multiplicity: u32,
    /// Raw shared-hashes field, e.g. "987/1000"
    pub shared_hashes: String,
    pub p_value: f64,
}

impl HitRecord {
    /// Convenience constructor used for rows without raw hash counts.
    pub fn new(serotype_hit: &str, percent: f64, identity: f64, multiplicity: u32) -> Self {
        HitRecord {
            serotype_hit: serotype_hit.to_string(),
            percent,
            identity,
            multiplicity,
            shared_hashes: String::new(),
            p_value: 0.0,
        }
    }

    /// Whether this hit passes both thresholds (inclusive).
    pub fn passes(&self, minpercent: f64, minmulti: u32) -> bool {
        self.percent >= minpercent && self.multiplicity >= minmulti
    }
}

/// Ordering used for both the filtered and the audit views:
/// percent descending, ties broken by identity descending.
pub fn compare_hits(a: &HitRecord, b: &HitRecord) -> Ordering {
    b.percent
        .total_cmp(&a.percent)
        .then_with(|| b.identity.total_cmp(&a.identity))
}

/// Sorts hits in place by percent then identity, both descending.
pub fn sort_hits(hits: &mut [HitRecord]) {
    hits.sort_by(compare_hits);
}

/// All screening rows for one sample, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitTable {
    pub sample_id: String,
    pub rows: Vec<HitRecord>,
}

impl HitTable {
    pub fn new(sample_id: impl Into<String>, rows: Vec<HitRecord>) -> Self {
        HitTable {
            sample_id: sample_id.into(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Maximum percent over every row, or 0.0 for an empty table.
    pub fn max_percent(&self) -> f64 {
        self.rows
            .iter()
            .map(|hit| hit.percent)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |m| m.max(p))))
            .unwrap_or(0.0)
    }

    /// A copy of all rows in report order.
    pub fn sorted_rows(&self) -> Vec<HitRecord> {
        let mut rows = self.rows.clone();
        sort_hits(&mut rows);
        rows
    }
}

/// Result of applying thresholds to a [`HitTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Hits passing both thresholds, sorted by percent then identity
    pub filtered: Vec<HitRecord>,
    /// Every input row, untouched and in input order
    pub original: Vec<HitRecord>,
    /// Maximum percent over the original rows
    pub max_percent: f64,
    pub minpercent: f64,
    pub minmulti: u32,
}

impl FilterOutcome {
    /// The hits that survived filtering.
    pub fn top_hits(&self) -> &[HitRecord] {
        &self.filtered
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Renders hits as `ID (percent%)` joined by ", ".
pub fn summarise_hits(hits: &[HitRecord]) -> String {
    hits.iter()
        .map(|hit| format!("{} ({:.2}%)", hit.serotype_hit, hit.percent))
        .join(", ")
}

/// Applies the percent and multiplicity thresholds to a table.
///
/// An empty filtered set is a normal outcome; callers decide whether to
/// retry with a relaxed threshold. `max_percent` always comes from the
/// unfiltered rows.
pub fn apply_filters(table: &HitTable, minpercent: f64, minmulti: u32) -> FilterOutcome {
    let mut filtered: Vec<HitRecord> = table
        .rows
        .iter()
        .filter(|hit| hit.passes(minpercent, minmulti))
        .cloned()
        .collect();
    sort_hits(&mut filtered);

    FilterOutcome {
        filtered,
        original: table.rows.clone(),
        max_percent: table.max_percent(),
        minpercent,
        minmulti,
    }
}
