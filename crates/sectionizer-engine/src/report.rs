//! Report serialization.
//!
//! Pure output: the final categorized list, per-section observed-vs-expected
//! counts, the ordered correction log, and summary statistics. No business
//! logic lives here; write failures surface as errors, never silently.

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use sectionizer_core::{
    CategorizedField, Correction, ReferenceTable, SectionId, SectionizerError,
};

use crate::healing::{observed_counts, HealingRun, IterationStats};

/// Observed vs expected for one section.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SectionRow {
    pub section: SectionId,
    pub observed: u32,
    pub expected: u32,
    /// observed − expected.
    pub deviation: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Summary {
    pub total_fields: usize,
    /// Fields still in the unclassified bucket.
    pub unclassified: usize,
    pub corrections: usize,
    pub iterations: u32,
    pub total_deviation: u32,
}

/// The run's single output artifact.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: String,
    /// "converged" or "partial".
    pub status: &'static str,
    pub summary: Summary,
    pub sections: Vec<SectionRow>,
    pub iterations: Vec<IterationStats>,
    pub corrections: Vec<Correction>,
    pub fields: Vec<CategorizedField>,
}

impl Report {
    pub fn build(run: &HealingRun, reference: &ReferenceTable) -> Self {
        let observed = observed_counts(&run.fields);

        let mut sections: Vec<SectionId> = reference.sections();
        for s in observed.keys() {
            if !sections.contains(s) {
                sections.push(*s);
            }
        }
        sections.sort();

        let section_rows: Vec<SectionRow> = sections
            .into_iter()
            .map(|section| {
                let obs = observed.get(&section).copied().unwrap_or(0);
                let exp = reference.expected(section).fields;
                SectionRow {
                    section,
                    observed: obs,
                    expected: exp,
                    deviation: i64::from(obs) - i64::from(exp),
                }
            })
            .collect();

        let unclassified = run
            .fields
            .iter()
            .filter(|f| !f.section.is_classified())
            .count();

        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            status: run.status.as_str(),
            summary: Summary {
                total_fields: run.fields.len(),
                unclassified,
                corrections: run.corrections.len(),
                iterations: run.iterations,
                total_deviation: run.total_deviation,
            },
            sections: section_rows,
            iterations: run.trace.clone(),
            corrections: run.corrections.clone(),
            fields: run.fields.clone(),
        }
    }

    /// Serialize as pretty JSON.
    pub fn write_json<W: Write>(&self, writer: &mut W) -> Result<(), SectionizerError> {
        serde_json::to_writer_pretty(&mut *writer, self)
            .map_err(|e| SectionizerError::Report(e.to_string()))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
