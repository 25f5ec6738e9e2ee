use indexmap::IndexSet;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::bio::hits::HitRecord;
use crate::bio::taxonomy::{GroupId, ReferenceLookup};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error(
        "Stage 1 hit unexpected ({serotype_hit}) - please check integrity of the reference \
         database, all reference sequences MUST be accounted for in it."
    )]
    UnknownHit { serotype_hit: String },
    #[error(
        "Stage 1 group unexpected{} - please check integrity of the reference database, \
         all groups MUST be accounted for in it.",
        group_suffix(.group_id)
    )]
    UnknownGroup { group_id: Option<GroupId> },
}

fn group_suffix(group_id: &Option<GroupId>) -> String {
    group_id
        .map(|id| format!(" (group {})", id))
        .unwrap_or_default()
}

/// Stage 1 result categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Type,
    Subtype,
    Variants,
    Mix,
    Acapsular,
    NoHits,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Type => "type",
            Category::Subtype => "subtype",
            Category::Variants => "variants",
            Category::Mix => "mix",
            Category::Acapsular => "acapsular",
            Category::NoHits => "no_hits",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one sample's top hits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,

    /// Phenotype, mixed-serotype message or advisory text; unset for variants
    pub result_text: Option<String>,

    /// Group display name, set only for variants
    pub folder: Option<String>,

    /// Group identifier, set only for variants
    pub group_id: Option<GroupId>,

    /// Distinct phenotypes behind a mix/subtype/type call
    pub phenotypes: BTreeSet<String>,
}

impl ClassificationResult {
    fn with_text(category: Category, text: String, phenotypes: BTreeSet<String>) -> Self {
        ClassificationResult {
            category,
            result_text: Some(text),
            folder: None,
            group_id: None,
            phenotypes,
        }
    }

    /// A no-call result carrying only an advisory message.
    pub fn advisory(category: Category, text: impl Into<String>) -> Self {
        Self::with_text(category, text.into(), BTreeSet::new())
    }

    fn variants(folder: String, group_id: GroupId) -> Self {
        ClassificationResult {
            category: Category::Variants,
            result_text: None,
            folder: Some(folder),
            group_id: Some(group_id),
            phenotypes: BTreeSet::new(),
        }
    }

    /// The value reported as the sample's result: the folder for
    /// variants, the result text otherwise.
    pub fn display_result(&self) -> &str {
        match self.category {
            Category::Variants => self.folder.as_deref().unwrap_or_default(),
            _ => self.result_text.as_deref().unwrap_or_default(),
        }
    }
}

/// Renders a phenotype set as `{'A', 'B'}`.
pub fn format_phenotype_set(phenotypes: &BTreeSet<String>) -> String {
    format!(
        "{{{}}}",
        phenotypes.iter().map(|p| format!("'{}'", p)).join(", ")
    )
}

/// Resolves filtered hits against reference groups.
pub struct GroupResolver<'a, L: ReferenceLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: ReferenceLookup + ?Sized> GroupResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        GroupResolver { lookup }
    }

    /// Deduplicated phenotypes for a list of hits: the group display name
    /// for grouped hits, the predicted phenotype otherwise.
    pub fn phenotypes<'h, I>(&self, hits: I) -> Result<BTreeSet<String>, ClassificationError>
    where
        I: IntoIterator<Item = &'h str>,
    {
        let mut phenotypes = BTreeSet::new();
        for hit in hits {
            let pheno = match self.lookup.lookup_group(hit) {
                Some(group_id) => self
                    .lookup
                    .group_name(group_id)
                    .ok_or(ClassificationError::UnknownGroup {
                        group_id: Some(group_id),
                    })?,
                None => self
                    .lookup
                    .lookup_phenotype(hit)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| ClassificationError::UnknownHit {
                        serotype_hit: hit.to_string(),
                    })?,
            };
            phenotypes.insert(pheno);
        }
        Ok(phenotypes)
    }

    /// Mix when more than one phenotype, otherwise a subtype named by the
    /// single phenotype.
    fn mix_or_subtype(
        &self,
        hits: &IndexSet<&str>,
    ) -> Result<ClassificationResult, ClassificationError> {
        let phenotypes = self.phenotypes(hits.iter().copied())?;
        match phenotypes.len() {
            0 => Err(ClassificationError::UnknownGroup { group_id: None }),
            1 => {
                let pheno = phenotypes.iter().next().cloned().unwrap_or_default();
                Ok(ClassificationResult::with_text(
                    Category::Subtype,
                    pheno,
                    phenotypes,
                ))
            }
            _ => {
                let text = format!("Mixed serotypes- {}", format_phenotype_set(&phenotypes));
                Ok(ClassificationResult::with_text(Category::Mix, text, phenotypes))
            }
        }
    }

    /// Classifies hits that already passed filtering.
    ///
    /// Rules, first match wins:
    /// 1. hits span several groups, or groups and standalone types -> mix/subtype
    /// 2. a single standalone hit -> type
    /// 3. several standalone hits -> mix/subtype
    /// 4. every hit in one group -> variants
    ///
    /// Rules 2 and 3 count surviving rows, so two rows naming the same
    /// reference are a subtype rather than a type.
    pub fn resolve(&self, hits: &[HitRecord]) -> Result<ClassificationResult, ClassificationError> {
        let results: IndexSet<&str> = hits.iter().map(|h| h.serotype_hit.as_str()).collect();

        let mut groups: BTreeSet<GroupId> = BTreeSet::new();
        let mut types: Vec<&str> = Vec::new();
        for hit in &results {
            match self.lookup.lookup_group(hit) {
                Some(group_id) => {
                    debug!("Hit {} is in group {}", hit, group_id);
                    groups.insert(group_id);
                }
                None => {
                    debug!("Hit {} is a standalone type", hit);
                    types.push(*hit);
                }
            }
        }

        if groups.len() > 1 || (!groups.is_empty() && !types.is_empty()) {
            return self.mix_or_subtype(&results);
        }

        if groups.is_empty() && hits.len() == 1 {
            let phenotypes = self.phenotypes(results.iter().copied())?;
            let pheno = phenotypes
                .iter()
                .next()
                .cloned()
                .ok_or_else(|| ClassificationError::UnknownHit {
                    serotype_hit: results[0].to_string(),
                })?;
            return Ok(ClassificationResult::with_text(
                Category::Type,
                pheno,
                phenotypes,
            ));
        }

        if groups.is_empty() && hits.len() > 1 {
            return self.mix_or_subtype(&results);
        }

        // Only one group can be present here; lowest id keeps it deterministic
        let group_id = *groups
            .iter()
            .next()
            .ok_or(ClassificationError::UnknownGroup { group_id: None })?;
        let folder = self
            .lookup
            .group_name(group_id)
            .ok_or(ClassificationError::UnknownGroup {
                group_id: Some(group_id),
            })?;
        Ok(ClassificationResult::variants(folder, group_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::taxonomy::{ReferenceEntry, ReferenceTable};

    fn reference() -> ReferenceTable {
        ReferenceTable::from_entries(vec![
            ReferenceEntry::typed("A", "TypeA"),
            ReferenceEntry::typed("B", "TypeB"),
            ReferenceEntry::typed("A2", "TypeA"),
            ReferenceEntry::grouped("G1", "G1", 7, "GroupX"),
            ReferenceEntry::grouped("G2", "G2", 7, "GroupX"),
            ReferenceEntry::grouped("H1", "H1", 9, "GroupY"),
        ])
        .unwrap()
    }

    fn hits(ids: &[&str]) -> Vec<HitRecord> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| HitRecord::new(id, 95.0 - i as f64, 99.0, 5))
            .collect()
    }

    /// Lookup with a group membership but no group record.
    struct DanglingGroup;

    impl ReferenceLookup for DanglingGroup {
        fn lookup_group(&self, _serotype_hit: &str) -> Option<GroupId> {
            Some(3)
        }
        fn group_name(&self, _group_id: GroupId) -> Option<String> {
            None
        }
        fn lookup_phenotype(&self, _serotype_hit: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_single_type() {
        let table = reference();
        let result = GroupResolver::new(&table).resolve(&hits(&["A"])).unwrap();
        assert_eq!(result.category, Category::Type);
        assert_eq!(result.result_text.as_deref(), Some("TypeA"));
        assert_eq!(result.folder, None);
        assert_eq!(result.group_id, None);
    }

    #[test]
    fn test_repeated_hit_rows_are_subtype() {
        let table = reference();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["A", "A"]))
            .unwrap();
        assert_eq!(result.category, Category::Subtype);
        assert_eq!(result.result_text.as_deref(), Some("TypeA"));
        assert_eq!(result.phenotypes.len(), 1);
    }

    #[test]
    fn test_two_types_is_mix() {
        let table = reference();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["A", "B"]))
            .unwrap();
        assert_eq!(result.category, Category::Mix);
        assert_eq!(
            result.result_text.as_deref(),
            Some("Mixed serotypes- {'TypeA', 'TypeB'}")
        );
    }

    #[test]
    fn test_types_sharing_phenotype_is_subtype() {
        let table = reference();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["A", "A2"]))
            .unwrap();
        assert_eq!(result.category, Category::Subtype);
        assert_eq!(result.result_text.as_deref(), Some("TypeA"));
    }

    #[test]
    fn test_single_group_is_variants() {
        let table = reference();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["G1", "G2"]))
            .unwrap();
        assert_eq!(result.category, Category::Variants);
        assert_eq!(result.folder.as_deref(), Some("GroupX"));
        assert_eq!(result.group_id, Some(7));
        assert_eq!(result.result_text, None);
        assert_eq!(result.display_result(), "GroupX");

        let single = GroupResolver::new(&table).resolve(&hits(&["G1"])).unwrap();
        assert_eq!(single.category, Category::Variants);
    }

    #[test]
    fn test_two_groups_is_mix() {
        let table = reference();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["G1", "H1"]))
            .unwrap();
        assert_eq!(result.category, Category::Mix);
        assert_eq!(
            result.result_text.as_deref(),
            Some("Mixed serotypes- {'GroupX', 'GroupY'}")
        );
    }

    #[test]
    fn test_group_and_type_is_mix() {
        let table = reference();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["G1", "A"]))
            .unwrap();
        assert_eq!(result.category, Category::Mix);
        assert_eq!(result.phenotypes.len(), 2);
    }

    #[test]
    fn test_group_and_type_with_same_name_is_subtype() {
        let table = ReferenceTable::from_entries(vec![
            ReferenceEntry::typed("06E", "Group6"),
            ReferenceEntry::grouped("06A", "6A", 2, "Group6"),
        ])
        .unwrap();
        let result = GroupResolver::new(&table)
            .resolve(&hits(&["06A", "06E"]))
            .unwrap();
        assert_eq!(result.category, Category::Subtype);
        assert_eq!(result.result_text.as_deref(), Some("Group6"));
    }

    #[test]
    fn test_unknown_hit_is_integrity_fault() {
        let table = reference();
        let err = GroupResolver::new(&table)
            .resolve(&hits(&["nope"]))
            .unwrap_err();
        assert_eq!(
            err,
            ClassificationError::UnknownHit {
                serotype_hit: "nope".to_string()
            }
        );
        assert!(err.to_string().contains("please check integrity"));
    }

    #[test]
    fn test_empty_phenotype_is_integrity_fault() {
        let table = ReferenceTable::from_entries(vec![ReferenceEntry::typed("Z", "")]).unwrap();
        let err = GroupResolver::new(&table).resolve(&hits(&["Z"])).unwrap_err();
        assert!(matches!(err, ClassificationError::UnknownHit { .. }));
    }

    #[test]
    fn test_group_without_record_is_integrity_fault() {
        let err = GroupResolver::new(&DanglingGroup)
            .resolve(&hits(&["X"]))
            .unwrap_err();
        assert_eq!(err, ClassificationError::UnknownGroup { group_id: Some(3) });
    }

    #[test]
    fn test_no_hits_is_group_fault() {
        let table = reference();
        let err = GroupResolver::new(&table).resolve(&[]).unwrap_err();
        assert_eq!(err, ClassificationError::UnknownGroup { group_id: None });
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let table = reference();
        let resolver = GroupResolver::new(&table);
        let cases: [&[&str]; 4] = [&["A"], &["A", "B"], &["G1", "G2"], &["G1", "H1", "B"]];
        for ids in cases {
            let input = hits(ids);
            assert_eq!(resolver.resolve(&input), resolver.resolve(&input));
        }
    }

    #[test]
    fn test_works_through_trait_object() {
        let table = reference();
        let lookup: &dyn ReferenceLookup = &table;
        let result = GroupResolver::new(lookup).resolve(&hits(&["B"])).unwrap();
        assert_eq!(result.result_text.as_deref(), Some("TypeB"));
    }

    #[test]
    fn test_phenotypes_dedup() {
        let table = reference();
        let phenos = GroupResolver::new(&table)
            .phenotypes(["A", "A2", "G1", "G2"])
            .unwrap();
        let expected: BTreeSet<String> =
            ["TypeA", "GroupX"].iter().map(|s| s.to_string()).collect();
        assert_eq!(phenos, expected);
    }

    #[test]
    fn test_category_serialises_snake_case() {
        assert_eq!(serde_json::to_string(&Category::NoHits).unwrap(), "\"no_hits\"");
        assert_eq!(serde_json::to_string(&Category::Variants).unwrap(), "\"variants\"");
        assert_eq!(Category::Acapsular.to_string(), "acapsular");
    }
}
