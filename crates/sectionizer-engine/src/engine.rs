//! Rule index and single-field classification.
//!
//! Every loaded rule across all sections is evaluated against a field; the
//! successful matches are ranked by a fixed tie-break chain so that the best
//! match is deterministic for a fixed rule-loading order:
//!
//! 1. higher confidence,
//! 2. a real section before the default/unclassified bucket,
//! 3. the more specific (longer) pattern text,
//! 4. the earlier-loaded rule.

use std::cmp::Ordering;

use sectionizer_core::{FieldDescriptor, MatchRule, RuleSet, SectionId};

/// One successful rule match, with the rule's position in load order.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    /// Load-order index; the final tie-break.
    pub index: usize,
    pub rule: &'a MatchRule,
}

/// Best-match classification for a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub section: SectionId,
    pub subsection: Option<String>,
    pub confidence: f64,
    pub reason: String,
}

impl MatchResult {
    fn from_match(m: &RuleMatch<'_>) -> Self {
        let reason = if m.rule.description.is_empty() {
            format!("pattern `{}`", m.rule.pattern.source())
        } else {
            m.rule.description.clone()
        };
        Self {
            section: m.rule.section,
            subsection: m.rule.subsection.clone(),
            confidence: m.rule.confidence,
            reason,
        }
    }
}

/// Queryable index over all loaded rules.
///
/// Built once per pipeline invocation; holds its own copy of the rules so
/// the pipeline can rebuild it explicitly (no hidden process-wide cache).
#[derive(Debug, Clone)]
pub struct RuleIndex {
    rules: Vec<MatchRule>,
}

impl RuleIndex {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            rules: rules.rules().to_vec(),
        }
    }

    /// All matches for a field, best first.
    pub fn evaluate(&self, field: &FieldDescriptor) -> Vec<RuleMatch<'_>> {
        let mut matches: Vec<RuleMatch<'_>> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matches(field))
            .map(|(index, rule)| RuleMatch { index, rule })
            .collect();
        matches.sort_by(rank);
        matches
    }

    /// Best match for a field, or `None` when no rule matches.
    ///
    /// The caller maps `None` to the unclassified bucket with confidence 0.
    pub fn classify(&self, field: &FieldDescriptor) -> Option<MatchResult> {
        self.evaluate(field).first().map(MatchResult::from_match)
    }

    /// Best match targeting one specific section, if any rule for that
    /// section matches the field. Used as the healing loop's secondary
    /// signal.
    pub fn match_for_section(
        &self,
        field: &FieldDescriptor,
        section: SectionId,
    ) -> Option<MatchResult> {
        self.evaluate(field)
            .iter()
            .find(|m| m.rule.section == section)
            .map(MatchResult::from_match)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The tie-break chain. `total_cmp` keeps float ordering total and
/// deterministic.
fn rank(a: &RuleMatch<'_>, b: &RuleMatch<'_>) -> Ordering {
    b.rule
        .confidence
        .total_cmp(&a.rule.confidence)
        .then_with(|| {
            b.rule
                .section
                .is_classified()
                .cmp(&a.rule.section.is_classified())
        })
        .then_with(|| {
            b.rule
                .pattern
                .specificity()
                .cmp(&a.rule.pattern.specificity())
        })
        .then_with(|| a.index.cmp(&b.index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectionizer_core::rules::FieldPattern;

    fn field(name: &str) -> FieldDescriptor {
        FieldDescriptor::new("obj-1", name, 1)
    }

    fn rule(pattern: &str, section: u8, confidence: f64) -> MatchRule {
        MatchRule::new(
            FieldPattern::Contains(pattern.to_string()),
            SectionId(section),
            confidence,
        )
    }

    #[test]
    fn no_match_yields_none() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![rule("SSN", 4, 0.98)]));
        assert!(index.classify(&field("form1[0].Section17[0].RadioButtonList[0]")).is_none());
    }

    #[test]
    fn highest_confidence_wins() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![
            rule("Section4", 9, 0.60),
            rule("SSN", 4, 0.98),
        ]));
        let result = index.classify(&field("form1[0].Section4[0].SSN[0]")).unwrap();
        assert_eq!(result.section, SectionId(4));
        assert_eq!(result.confidence, 0.98);
    }

    #[test]
    fn real_section_beats_default_bucket_on_tie() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![
            rule("TextField11", 0, 0.80),
            rule("TextField11", 12, 0.80),
        ]));
        let result = index
            .classify(&field("form1[0].Section12[0].TextField11[3]"))
            .unwrap();
        assert_eq!(result.section, SectionId(12));
    }

    #[test]
    fn longer_pattern_beats_shorter_on_tie() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![
            rule("Section16", 16, 0.85),
            rule("Section16_3", 19, 0.85),
        ]));
        let result = index
            .classify(&field("form1[0].Section16_3[0].TextField11[7]"))
            .unwrap();
        assert_eq!(result.section, SectionId(19));
    }

    #[test]
    fn first_loaded_rule_wins_final_tie() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![
            rule("suffix", 5, 0.75),
            rule("suffix", 16, 0.75),
        ]));
        let result = index.classify(&field("form1[0].Section5[0].suffix[0]")).unwrap();
        assert_eq!(result.section, SectionId(5));
    }

    #[test]
    fn evaluate_returns_all_matches_best_first() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![
            rule("TextField11", 12, 0.60),
            rule("Section16", 16, 0.85),
        ]));
        let matches = index.evaluate(&field("form1[0].Section16[0].TextField11[2]"));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].rule.section, SectionId(16));
        assert_eq!(matches[1].rule.section, SectionId(12));
    }

    #[test]
    fn match_for_section_finds_secondary_match() {
        let index = RuleIndex::new(&RuleSet::from_rules(vec![
            rule("TextField11", 12, 0.60),
            rule("Section16", 16, 0.85),
        ]));
        let f = field("form1[0].Section16[0].TextField11[2]");
        let secondary = index.match_for_section(&f, SectionId(12)).unwrap();
        assert_eq!(secondary.confidence, 0.60);
        assert!(index.match_for_section(&f, SectionId(4)).is_none());
    }

    #[test]
    fn reason_prefers_description() {
        let with_desc = rule("SSN", 4, 0.98).with_description("social security number block");
        let index = RuleIndex::new(&RuleSet::from_rules(vec![with_desc]));
        let result = index.classify(&field("form1[0].Section4[0].SSN[0]")).unwrap();
        assert_eq!(result.reason, "social security number block");

        let index = RuleIndex::new(&RuleSet::from_rules(vec![rule("SSN", 4, 0.98)]));
        let result = index.classify(&field("form1[0].Section4[0].SSN[0]")).unwrap();
        assert_eq!(result.reason, "pattern `SSN`");
    }
}
