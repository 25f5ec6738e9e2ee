//! Stage 1 capsular serotype calling.
//!
//! Reads Mash screen hits for a sample, filters them against percent and
//! multiplicity thresholds (retrying once at a relaxed threshold when a
//! strong sample comes back empty), and resolves the surviving hits against
//! a reference taxonomy of serotypes and genogroups to produce a single call:
//! type, subtype, variants, mix, acapsular or no hits.

pub mod adaptive;
pub mod bio;
pub mod cli;
pub mod config;
pub mod io;
pub mod pipeline;
pub mod utils;
