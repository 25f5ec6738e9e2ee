//! Screening hits and the reference serotype taxonomy.

pub mod hits;
pub mod taxonomy;

pub use hits::{apply_filters, sort_hits, FilterOutcome, HitRecord, HitTable};
pub use taxonomy::{GroupId, ReferenceEntry, ReferenceError, ReferenceLookup, ReferenceTable};
