//! Pipeline orchestration.
//!
//! One invocation owns its rule index — the explicit replacement for what
//! used to be a memoized process-wide mapping. `reset` rebuilds the index
//! from the loaded rules; nothing else caches state between runs.

use tracing::info;

use sectionizer_core::{
    FieldDescriptor, PipelineConfig, ReferenceTable, RuleSet, SectionizerError,
};

use crate::classifier::classify_all;
use crate::engine::RuleIndex;
use crate::healing::{HealingManager, HealingRun};
use crate::report::Report;

/// Final assignment plus its report.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub run: HealingRun,
    pub report: Report,
}

/// Classify → heal → report, over one batch of field descriptors.
pub struct Pipeline {
    rules: RuleSet,
    reference: ReferenceTable,
    config: PipelineConfig,
    index: RuleIndex,
}

impl Pipeline {
    pub fn new(rules: RuleSet, reference: ReferenceTable, config: PipelineConfig) -> Self {
        let index = RuleIndex::new(&rules);
        Self {
            rules,
            reference,
            config,
            index,
        }
    }

    /// Rebuild the rule index from the loaded rules.
    pub fn reset(&mut self) {
        self.index = RuleIndex::new(&self.rules);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole batch.
    ///
    /// Hard failures: an empty field list, or an empty reference table.
    /// Everything else in the error taxonomy is soft and lands in the
    /// report or the logs.
    pub fn run(&self, fields: &[FieldDescriptor]) -> Result<PipelineOutcome, SectionizerError> {
        if fields.is_empty() {
            return Err(SectionizerError::NoFields);
        }
        if self.reference.is_empty() {
            return Err(SectionizerError::EmptyReferenceTable);
        }

        info!(fields = fields.len(), rules = self.index.len(), "classifying");
        let categorized = classify_all(fields, &self.index, &self.config);

        let run = HealingManager::new(&self.reference, &self.index, &self.config)
            .heal(categorized)?;
        info!(
            status = run.status.as_str(),
            corrections = run.corrections.len(),
            total_deviation = run.total_deviation,
            "healing finished"
        );

        let report = Report::build(&run, &self.reference);
        Ok(PipelineOutcome { run, report })
    }
}
