pub mod report;
pub mod stage1;

pub use report::generate_report;
pub use stage1::{RagStatus, Stage1Error, Stage1Processor, Stage1Report};
