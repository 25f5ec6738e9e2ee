//! Reading Mash screen output.
//!
//! `mash screen` writes one headerless, tab-separated row per reference:
//!
//! ```text
//! identity  shared-hashes  median-multiplicity  p-value  query-ID  [query-comment]
//! 0.998     987/1000       24                   0        refs/06B.fasta
//! ```
//!
//! Each row becomes a [`HitRecord`] with percent containment derived from
//! the shared-hashes fraction and identity scaled to 0-100.

use crate::bio::hits::{HitRecord, HitTable};
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MashError {
    #[error("No Mash data - empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Mash output path not available: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed Mash row at {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("TSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Sample name for a screen file: the file name without its extension.
pub fn sample_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Serotype identifier from a query-ID such as `refs/06B.fasta.gz`.
pub fn serotype_from_query_id(query_id: &str) -> String {
    let name = Path::new(query_id)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| query_id.to_string());
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("fasta" | "fa" | "fna" | "fas" | "fsa" | "msh") => Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string()),
        _ => name.to_string(),
    }
}

/// Converts a shared-hashes field (`987/1000`) into percent containment.
pub fn parse_shared_hashes(field: &str) -> Option<f64> {
    let (shared, total) = field.trim().split_once('/')?;
    let shared: f64 = shared.trim().parse().ok()?;
    let total: f64 = total.trim().parse().ok()?;
    if total <= 0.0 {
        return None;
    }
    Some(shared / total * 100.0)
}

fn parse_row(record: &csv::StringRecord, path: &Path, line: usize) -> Result<HitRecord, MashError> {
    let parse_err = |message: String| MashError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    if record.len() < 5 {
        return Err(parse_err(format!(
            "expected at least 5 columns, found {}",
            record.len()
        )));
    }

    let identity: f64 = record[0]
        .trim()
        .parse()
        .map_err(|_| parse_err(format!("invalid identity '{}'", &record[0])))?;
    let shared_hashes = record[1].trim().to_string();
    let percent = parse_shared_hashes(&shared_hashes)
        .ok_or_else(|| parse_err(format!("invalid shared-hashes '{}'", shared_hashes)))?;
    let multiplicity: u32 = record[2]
        .trim()
        .parse()
        .map_err(|_| parse_err(format!("invalid median-multiplicity '{}'", &record[2])))?;
    let p_value: f64 = record[3]
        .trim()
        .parse()
        .map_err(|_| parse_err(format!("invalid p-value '{}'", &record[3])))?;
    let query_id = record[4].trim();
    if query_id.is_empty() {
        return Err(parse_err("empty query-ID".to_string()));
    }

    Ok(HitRecord {
        serotype_hit: serotype_from_query_id(query_id),
        percent,
        identity: identity * 100.0,
        multiplicity,
        shared_hashes,
        p_value,
    })
}

/// Reads a Mash screen TSV into a [`HitTable`].
///
/// A missing or zero-length file, or one without any data rows, is
/// reported as [`MashError::EmptyFile`].
pub fn read_mash_screen(path: impl AsRef<Path>) -> Result<HitTable, MashError> {
    let path = path.as_ref();

    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MashError::EmptyFile(path.to_path_buf()))
        }
        Err(source) => {
            return Err(MashError::Unavailable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if !metadata.is_file() || metadata.len() == 0 {
        return Err(MashError::EmptyFile(path.to_path_buf()));
    }

    let file = fs::File::open(path).map_err(|source| MashError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(file);

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(i + 1, |p| p.line() as usize);
        rows.push(parse_row(&record, path, line)?);
    }

    let table = HitTable::new(sample_id_from_path(path), rows);
    if table.is_empty() {
        return Err(MashError::EmptyFile(path.to_path_buf()));
    }

    info!(
        "Read {} Mash screen hits for sample {} from {}",
        table.len(),
        table.sample_id,
        path.display()
    );
    Ok(table)
}

/// Finds Mash screen files (`*.tsv`) directly inside a directory, sorted by path.
pub fn find_screen_files(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry_path = entry?.path();
        if !entry_path.is_file() {
            continue;
        }
        match entry_path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => files.push(entry_path),
            _ => debug!("Skipping non-TSV file: {:?}", entry_path),
        }
    }
    if files.is_empty() {
        warn!("No Mash screen files found in {}", dir.display());
    }
    files.sort();
    Ok(files)
}
