use crate::adaptive::{
    format_phenotype_set, Category, ClassificationError, ClassificationResult, Fallback,
    GroupResolver,
};
use crate::bio::hits::{apply_filters, summarise_hits, FilterOutcome, HitRecord, HitTable};
use crate::bio::taxonomy::{GroupId, ReferenceLookup};
use crate::config::Stage1Config;
use crate::io::{read_mash_screen, write_hits_csv, write_result_json, MashError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum Stage1Error {
    #[error(transparent)]
    Input(#[from] MashError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Confidence tag attached to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RagStatus {
    Green,
    Amber,
}

impl RagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RagStatus::Green => "GREEN",
            RagStatus::Amber => "AMBER",
        }
    }
}

/// Stage 1 outcome for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Report {
    pub sample_id: String,
    /// Unset for acapsular/no-hits calls made without a retry
    pub rag_status: Option<RagStatus>,
    pub result: ClassificationResult,
    /// Best percent over all hits, rounded to 2 decimals
    pub max_percent: f64,
    pub minpercent: f64,
    pub minmulti: u32,
    /// Threshold used by the retry pass, when one ran
    pub relaxed_minpercent: Option<f64>,
    pub top_hits: Vec<HitRecord>,
    pub hits_csv: Option<PathBuf>,
}

impl Stage1Report {
    pub fn category(&self) -> Category {
        self.result.category
    }

    pub fn result_text(&self) -> &str {
        self.result.display_result()
    }

    pub fn folder(&self) -> Option<&str> {
        self.result.folder.as_deref()
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.result.group_id
    }

    /// True when the first filtering pass produced no top hits.
    pub fn first_pass_empty(&self) -> bool {
        self.relaxed_minpercent.is_some()
            || matches!(self.category(), Category::Acapsular | Category::NoHits)
    }

    pub fn top_hits_summary(&self) -> String {
        summarise_hits(&self.top_hits)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Stage 1 pipeline: filter hits, retry once if needed, resolve groups.
pub struct Stage1Processor<'a, L: ReferenceLookup + ?Sized> {
    pub config: Stage1Config,
    pub write_json: bool,
    lookup: &'a L,
}

impl<'a, L: ReferenceLookup + ?Sized> Stage1Processor<'a, L> {
    pub fn new(config: Stage1Config, lookup: &'a L) -> Self {
        Stage1Processor {
            config,
            write_json: false,
            lookup,
        }
    }

    pub fn with_json(mut self, write_json: bool) -> Self {
        self.write_json = write_json;
        self
    }

    fn resolve(
        &self,
        outcome: &FilterOutcome,
    ) -> Result<ClassificationResult, ClassificationError> {
        GroupResolver::new(self.lookup).resolve(outcome.top_hits())
    }

    /// Classifies a non-empty hit table without touching the filesystem.
    pub fn classify(&self, table: &HitTable) -> Result<Stage1Report, ClassificationError> {
        let filter = &self.config.filter;
        let policy = &self.config.retry;

        let mut outcome = apply_filters(table, filter.minpercent, filter.minmulti);
        let max_percent = round2(outcome.max_percent);
        info!(
            "Sample {}: {} of {} hits pass minpercent {} / minmulti {} (max percent {})",
            table.sample_id,
            outcome.filtered.len(),
            table.len(),
            filter.minpercent,
            filter.minmulti,
            max_percent
        );

        let mut relaxed_minpercent = None;
        let (result, rag_status) = if !outcome.is_empty() {
            let result = self.resolve(&outcome)?;
            let rag = match result.category {
                Category::Mix => RagStatus::Amber,
                _ => RagStatus::Green,
            };
            (result, Some(rag))
        } else {
            match policy.on_empty(max_percent, filter.minpercent) {
                Fallback::Retry(relaxed) => {
                    warn!(
                        "Sample {}: no hits at minpercent {}, retrying at {:.2}",
                        table.sample_id, filter.minpercent, relaxed
                    );
                    relaxed_minpercent = Some(relaxed);
                    outcome = apply_filters(table, relaxed, filter.minmulti);
                    let result = if outcome.is_empty() {
                        // Retry runs once; a second empty pass is a no-call
                        policy.no_call(max_percent)
                    } else {
                        self.resolve(&outcome)?
                    };
                    (result, Some(RagStatus::Amber))
                }
                Fallback::NoCall(result) => (result, None),
            }
        };

        info!(
            "Sample {}: category {} - {}",
            table.sample_id,
            result.category,
            result.display_result()
        );

        Ok(Stage1Report {
            sample_id: table.sample_id.clone(),
            rag_status,
            result,
            max_percent,
            minpercent: filter.minpercent,
            minmulti: filter.minmulti,
            relaxed_minpercent,
            top_hits: outcome.filtered,
            hits_csv: None,
        })
    }

    /// Reads a Mash screen file, classifies it and writes the audit CSV
    /// (and JSON result if enabled) into `output_dir`.
    pub fn process_file(
        &self,
        tsv_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Stage1Report, Stage1Error> {
        let start_time = Instant::now();
        let tsv_path = tsv_path.as_ref();
        let output_path = output_dir.as_ref();

        let table = read_mash_screen(tsv_path)?;
        let mut report = self.classify(&table)?;
        for line in announcements(&report) {
            println!("{}", line);
        }

        fs::create_dir_all(output_path)?;
        let csv_path = output_path.join(format!("{}.csv", table.sample_id));
        write_hits_csv(&table.sorted_rows(), &csv_path)?;
        info!("Wrote {} hits to {}", table.len(), csv_path.display());
        report.hits_csv = Some(csv_path);

        if self.write_json {
            let json_path = output_path.join(format!("{}_stage1.json", table.sample_id));
            write_result_json(&report, &json_path)?;
            info!("Wrote result to {}", json_path.display());
        }

        info!(
            "Stage 1 for sample '{}' finished in {:.2} seconds.",
            report.sample_id,
            start_time.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}

/// Operator-facing stdout lines for mixed calls and first-pass misses.
fn announcements(report: &Stage1Report) -> Vec<String> {
    let mut lines = Vec::new();
    if report.category() == Category::Mix {
        lines.push(format!(
            "Mixed serotypes found - {}",
            format_phenotype_set(&report.result.phenotypes)
        ));
    }
    if report.first_pass_empty() {
        lines.push(report.result_text().to_string());
    }
    lines
}
