//! Human-readable summary of a sectionizer run.
//!
//! The JSON report is the artifact; this is the operator-facing view,
//! printed to stderr so it never mixes with a report on stdout.

use sectionizer_engine::Report;

pub fn print_summary(report: &Report) {
    eprintln!();
    eprintln!("── Sectionizer run ({}) ──", report.status);
    eprintln!(
        "  {} fields, {} unclassified, {} corrections over {} iterations",
        report.summary.total_fields,
        report.summary.unclassified,
        report.summary.corrections,
        report.summary.iterations,
    );
    eprintln!("  remaining deviation: {}", report.summary.total_deviation);
    eprintln!();
    eprintln!("  {:<14} {:>8} {:>8} {:>9}", "section", "observed", "expected", "deviation");

    for row in &report.sections {
        // Only show rows with activity; a clean zero row is noise.
        if row.observed == 0 && row.expected == 0 {
            continue;
        }
        let marker = if row.deviation == 0 { " " } else { "!" };
        eprintln!(
            "  {:<14} {:>8} {:>8} {:>8}{}",
            row.section.to_string(),
            row.observed,
            row.expected,
            row.deviation,
            marker,
        );
    }

    if !report.corrections.is_empty() {
        eprintln!();
        eprintln!("  corrections:");
        for c in &report.corrections {
            eprintln!(
                "    [{}] {} : {} → {} ({})",
                c.iteration, c.field_name, c.from_section, c.to_section, c.reason
            );
        }
    }
    eprintln!();
}
