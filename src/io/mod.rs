//! Input/Output operations module.
//!
//! Handles reading Mash screen output and writing per-sample results
//! (the audit CSV of all hits and the optional JSON result).

pub mod mash;

pub use mash::{find_screen_files, read_mash_screen, MashError};

use crate::bio::hits::HitRecord;
use crate::pipeline::stage1::Stage1Report;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes hits to a CSV file in the order given.
///
/// # Arguments
///
/// * `hits` - Rows to write, normally the full sorted hit table.
/// * `output_path` - The path to the output CSV file.
pub fn write_hits_csv(hits: &[HitRecord], output_path: &Path) -> Result<(), csv::Error> {
    let file = File::create(output_path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record([
        "Serotype",
        "percent",
        "identity",
        "median-multiplicity",
        "shared-hashes",
        "p-value",
    ])?;

    for hit in hits {
        let percent = format!("{:.2}", hit.percent);
        let identity = format!("{:.2}", hit.identity);
        let multiplicity = hit.multiplicity.to_string();
        let p_value = hit.p_value.to_string();
        writer.write_record([
            hit.serotype_hit.as_str(),
            percent.as_str(),
            identity.as_str(),
            multiplicity.as_str(),
            hit.shared_hashes.as_str(),
            p_value.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a sample's classification as pretty-printed JSON.
pub fn write_result_json(
    report: &Stage1Report,
    output_path: &Path,
) -> Result<(), serde_json::Error> {
    let file = File::create(output_path).map_err(serde_json::Error::io)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}
