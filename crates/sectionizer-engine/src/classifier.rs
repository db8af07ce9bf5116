//! Whole-list classification.
//!
//! `classify_all` is a pure function of its inputs and the loaded rule set:
//! running it twice on the same inputs produces identical output, which is
//! what makes audit runs reproducible. It never consults the reference
//! count table — reconciliation is the healing loop's job.

use std::sync::LazyLock;

use regex::Regex;
use sectionizer_core::{CategorizedField, FieldDescriptor, PipelineConfig};

use crate::engine::RuleIndex;

/// Repeated-group marker inside raw field names, e.g.
/// `form1[0].Section16_3[0].#area[1].From_Datefield_Name_2[0]`.
static AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#area\[(\d+)\]").unwrap());

/// Classify every field, preserving input order.
///
/// Unmatched fields land in the unclassified bucket with confidence 0 and
/// no protection, which keeps them eligible for healing.
pub fn classify_all(
    fields: &[FieldDescriptor],
    index: &RuleIndex,
    config: &PipelineConfig,
) -> Vec<CategorizedField> {
    fields
        .iter()
        .map(|field| classify_one(field, index, config))
        .collect()
}

fn classify_one(
    field: &FieldDescriptor,
    index: &RuleIndex,
    config: &PipelineConfig,
) -> CategorizedField {
    match index.classify(field) {
        Some(m) => CategorizedField::new(
            field.clone(),
            m.section,
            m.subsection,
            derive_entry(&field.name),
            m.confidence,
            m.reason,
            config.explicit_threshold,
        ),
        None => CategorizedField::unclassified(field.clone()),
    }
}

/// Entry index for repeated-group fields.
///
/// The template marks per-entry blocks with `#area[n]`; entry numbering is
/// 1-based (area 0 is entry 1, matching the reference extraction audits).
pub fn derive_entry(name: &str) -> Option<u32> {
    AREA_RE
        .captures(name)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|area| area + 1)
}
