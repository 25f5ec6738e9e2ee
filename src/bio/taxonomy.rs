//! Reference serotype taxonomy.
//!
//! Serotypes are either standalone (reported by their predicted phenotype)
//! or members of a genogroup (reported by the group's display name). The
//! classifier only sees the [`ReferenceLookup`] capability; [`ReferenceTable`]
//! is the in-memory implementation loaded from a reference CSV.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Numeric genogroup identifier.
pub type GroupId = u32;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Duplicate reference serotype: {0}")]
    DuplicateSerotype(String),

    #[error("Reference table {0} contains no serotypes")]
    Empty(String),
}

/// Read-only view of the reference taxonomy used during classification.
pub trait ReferenceLookup {
    /// Group a serotype hit belongs to, if any.
    fn lookup_group(&self, serotype_hit: &str) -> Option<GroupId>;

    /// Display name of a group.
    fn group_name(&self, group_id: GroupId) -> Option<String>;

    /// Predicted phenotype of a serotype hit.
    fn lookup_phenotype(&self, serotype_hit: &str) -> Option<String>;
}

/// One serotype's placement in the reference taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub serotype_hit: String,
    pub predicted_pheno: Option<String>,
    pub group_id: Option<GroupId>,
    pub group_name: Option<String>,
}

impl ReferenceEntry {
    /// A standalone serotype.
    pub fn typed(serotype_hit: &str, phenotype: &str) -> Self {
        ReferenceEntry {
            serotype_hit: serotype_hit.to_string(),
            predicted_pheno: Some(phenotype.to_string()),
            group_id: None,
            group_name: None,
        }
    }

    /// A serotype that belongs to a genogroup.
    pub fn grouped(
        serotype_hit: &str,
        phenotype: &str,
        group_id: GroupId,
        group_name: &str,
    ) -> Self {
        ReferenceEntry {
            serotype_hit: serotype_hit.to_string(),
            predicted_pheno: Some(phenotype.to_string()),
            group_id: Some(group_id),
            group_name: Some(group_name.to_string()),
        }
    }
}

/// In-memory reference taxonomy keyed by serotype hit.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: HashMap<String, ReferenceEntry>,
    // BTreeMap so anomalies are reported in a stable order
    groups: BTreeMap<GroupId, Option<String>>,
}

impl ReferenceTable {
    /// Builds a table from entries, rejecting duplicate serotypes.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, ReferenceError> {
        let mut table = ReferenceTable::default();

        for entry in entries {
            if let Some(group_id) = entry.group_id {
                let name = table.groups.entry(group_id).or_insert(None);
                if name.is_none() {
                    *name = entry
                        .group_name
                        .as_ref()
                        .filter(|n| !n.trim().is_empty())
                        .cloned();
                }
            }
            if table.entries.contains_key(&entry.serotype_hit) {
                return Err(ReferenceError::DuplicateSerotype(entry.serotype_hit));
            }
            table.entries.insert(entry.serotype_hit.clone(), entry);
        }

        for group_id in table.unnamed_groups() {
            warn!(
                "Reference group {} has no display name; hits in it cannot be reported",
                group_id
            );
        }

        Ok(table)
    }

    /// Loads a reference CSV with columns
    /// `serotype_hit,predicted_pheno,group_id,group_name`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: ReferenceEntry = result?;
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(ReferenceError::Empty(path.display().to_string()));
        }
        debug!(
            "Loaded {} reference serotypes from {}",
            entries.len(),
            path.display()
        );

        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn get(&self, serotype_hit: &str) -> Option<&ReferenceEntry> {
        self.entries.get(serotype_hit)
    }

    /// Group ids referenced by some serotype but never given a name.
    pub fn unnamed_groups(&self) -> Vec<GroupId> {
        self.groups
            .iter()
            .filter(|(_, name)| name.is_none())
            .map(|(id, _)| *id)
            .collect()
    }
}

impl ReferenceLookup for ReferenceTable {
    fn lookup_group(&self, serotype_hit: &str) -> Option<GroupId> {
        self.entries.get(serotype_hit).and_then(|e| e.group_id)
    }

    fn group_name(&self, group_id: GroupId) -> Option<String> {
        self.groups.get(&group_id).cloned().flatten()
    }

    fn lookup_phenotype(&self, serotype_hit: &str) -> Option<String> {
        self.entries
            .get(serotype_hit)
            .and_then(|e| e.predicted_pheno.clone())
    }
}
