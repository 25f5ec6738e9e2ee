//! Plain-text summary of a sample's stage 1 call.

use crate::pipeline::stage1::Stage1Report;

/// Builds the per-sample summary printed after classification.
pub fn generate_report(report: &Stage1Report) -> String {
    let mut report_text = String::new();

    // Header
    report_text.push_str(&format!(
        "Stage 1 Serotype Report for Sample: {}\n",
        report.sample_id
    ));
    report_text.push_str("=================================================\n\n");

    // Thresholds section
    report_text.push_str("Filtering:\n");
    report_text.push_str(&format!("  Minimum percent: {}\n", report.minpercent));
    report_text.push_str(&format!("  Minimum multiplicity: {}\n", report.minmulti));
    report_text.push_str(&format!("  Maximum hit percent: {:.2}\n", report.max_percent));
    if let Some(relaxed) = report.relaxed_minpercent {
        report_text.push_str(&format!(
            "  Retried at relaxed minimum percent: {:.2}\n",
            relaxed
        ));
    }
    report_text.push('\n');

    // Result section
    report_text.push_str("Result:\n");
    report_text.push_str(&format!("  Category: {}\n", report.category()));
    report_text.push_str(&format!("  Result: {}\n", report.result_text()));
    if let (Some(folder), Some(group_id)) = (report.folder(), report.group_id()) {
        report_text.push_str(&format!("  Group: {} (id {})\n", folder, group_id));
    }
    report_text.push_str(&format!(
        "  RAG status: {}\n",
        report.rag_status.map_or("N/A", |r| r.as_str())
    ));

    if report.top_hits.is_empty() {
        report_text.push_str("  Top hits: none\n");
    } else {
        report_text.push_str(&format!("  Top hits: {}\n", report.top_hits_summary()));
    }

    if let Some(path) = &report.hits_csv {
        report_text.push_str(&format!("\nAll hits written to: {}\n", path.display()));
    }

    report_text
}
