//! Match rules and rule-set loading.
//!
//! Rules are data, not code: each section contributes an ordered table of
//! declarative entries (pattern, target section, optional subsection,
//! confidence, description) which are compiled once per run and merged into
//! a single [`RuleSet`]. A malformed pattern fails closed — that one rule is
//! skipped with a warning, the rest of the table proceeds.

use std::io::Read;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::error::SectionizerError;
use crate::field::{FieldDescriptor, FieldType};
use crate::section::SectionId;

/// Which part of the descriptor a rule's pattern is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    #[default]
    Name,
    Label,
}

/// A compiled text pattern over a field name or label.
#[derive(Debug, Clone)]
pub enum FieldPattern {
    Prefix(String),
    Contains(String),
    Regex(Regex),
}

impl FieldPattern {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            FieldPattern::Prefix(p) => text.starts_with(p.as_str()),
            FieldPattern::Contains(p) => text.contains(p.as_str()),
            FieldPattern::Regex(re) => re.is_match(text),
        }
    }

    /// The literal pattern text as declared in the rule table.
    pub fn source(&self) -> &str {
        match self {
            FieldPattern::Prefix(p) | FieldPattern::Contains(p) => p.as_str(),
            FieldPattern::Regex(re) => re.as_str(),
        }
    }

    /// Specificity proxy for tie-breaking: longer pattern text wins.
    pub fn specificity(&self) -> usize {
        self.source().len()
    }
}

/// One compiled rule belonging to a section's rule set.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: FieldPattern,
    pub section: SectionId,
    pub subsection: Option<String>,
    /// In (0, 1]; validated at load time.
    pub confidence: f64,
    /// Human-readable reason recorded in match provenance.
    pub description: String,
    pub target: RuleTarget,
    /// When set, the rule only applies to fields of this widget type.
    pub field_type: Option<FieldType>,
}

impl MatchRule {
    pub fn new(pattern: FieldPattern, section: SectionId, confidence: f64) -> Self {
        Self {
            pattern,
            section,
            subsection: None,
            confidence,
            description: String::new(),
            target: RuleTarget::Name,
            field_type: None,
        }
    }

    pub fn with_subsection(mut self, subsection: impl Into<String>) -> Self {
        self.subsection = Some(subsection.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn matches(&self, field: &FieldDescriptor) -> bool {
        if let Some(required) = self.field_type
            && required != field.field_type
        {
            return false;
        }
        match self.target {
            RuleTarget::Name => self.pattern.matches(&field.name),
            RuleTarget::Label => field
                .label
                .as_deref()
                .is_some_and(|label| self.pattern.matches(label)),
        }
    }
}

// ── Declarative table representation ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Prefix,
    Contains,
    Regex,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub value: String,
}

/// One row of a declarative rule table, as it appears in JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub pattern: PatternSpec,
    pub section: u8,
    #[serde(default)]
    pub subsection: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target: RuleTarget,
    #[serde(default)]
    pub field_type: Option<FieldType>,
}

/// A rule that could not be compiled and was skipped.
#[derive(Debug, Clone)]
pub struct RuleLoadWarning {
    /// Index of the entry in its source table.
    pub index: usize,
    pub pattern: String,
    pub error: String,
}

/// All loaded rules across all sections, in load order.
///
/// Load order is significant: it is the final tie-break when two rules
/// match with equal confidence, bucket kind, and specificity.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<MatchRule>,
}

impl RuleSet {
    pub fn from_rules(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    /// Compile a declarative table, skipping malformed entries.
    ///
    /// Skipped entries are returned as warnings and logged; they never abort
    /// the run. An entry is malformed when its regex fails to compile or its
    /// confidence falls outside (0, 1].
    pub fn from_entries(entries: Vec<RuleEntry>) -> (Self, Vec<RuleLoadWarning>) {
        let mut rules = Vec::with_capacity(entries.len());
        let mut warnings = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            if !(entry.confidence > 0.0 && entry.confidence <= 1.0) {
                let warning = RuleLoadWarning {
                    index,
                    pattern: entry.pattern.value.clone(),
                    error: format!("confidence {} outside (0, 1]", entry.confidence),
                };
                warn!(index, pattern = %warning.pattern, "skipping rule: {}", warning.error);
                warnings.push(warning);
                continue;
            }

            let pattern = match entry.pattern.kind {
                PatternKind::Prefix => FieldPattern::Prefix(entry.pattern.value),
                PatternKind::Contains => FieldPattern::Contains(entry.pattern.value),
                PatternKind::Regex => match Regex::new(&entry.pattern.value) {
                    Ok(re) => FieldPattern::Regex(re),
                    Err(e) => {
                        let warning = RuleLoadWarning {
                            index,
                            pattern: entry.pattern.value,
                            error: e.to_string(),
                        };
                        warn!(index, pattern = %warning.pattern, "skipping rule: {}", warning.error);
                        warnings.push(warning);
                        continue;
                    }
                },
            };

            rules.push(MatchRule {
                pattern,
                section: SectionId(entry.section),
                subsection: entry.subsection,
                confidence: entry.confidence,
                description: entry.description,
                target: entry.target,
                field_type: entry.field_type,
            });
        }

        (Self { rules }, warnings)
    }

    /// Load a JSON rule table.
    pub fn load(reader: impl Read) -> Result<(Self, Vec<RuleLoadWarning>), SectionizerError> {
        let entries: Vec<RuleEntry> = serde_json::from_reader(reader)?;
        Ok(Self::from_entries(entries))
    }

    /// Append another table's rules, preserving both load orders.
    pub fn merge(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldDescriptor {
        FieldDescriptor::new("obj-1", name, 1)
    }

    #[test]
    fn prefix_contains_and_regex_patterns() {
        let prefix = FieldPattern::Prefix("form1[0].Section17".to_string());
        assert!(prefix.matches("form1[0].Section17[0].RadioButtonList[2]"));
        assert!(!prefix.matches("form1[0].Section16[0].TextField11[2]"));

        let contains = FieldPattern::Contains("SSN".to_string());
        assert!(contains.matches("form1[0].Section4[0].SSN[1]"));
        assert!(!contains.matches("form1[0].Section4[0].TextField11[1]"));

        let re = FieldPattern::Regex(Regex::new(r"TextField11\[\d+\]").unwrap());
        assert!(re.matches("form1[0].Section16_3[0].TextField11[22]"));
        assert!(!re.matches("form1[0].Section16_3[0].TextField11[x]"));
    }

    #[test]
    fn label_target_requires_a_label() {
        let mut rule = MatchRule::new(
            FieldPattern::Contains("Social Security".to_string()),
            SectionId(4),
            0.9,
        );
        rule.target = RuleTarget::Label;

        let unlabelled = field("form1[0].Section4[0].SSN[0]");
        assert!(!rule.matches(&unlabelled));

        let mut labelled = unlabelled.clone();
        labelled.label = Some("Social Security Number".to_string());
        assert!(rule.matches(&labelled));
    }

    #[test]
    fn field_type_restriction() {
        let mut rule = MatchRule::new(
            FieldPattern::Contains("RadioButtonList".to_string()),
            SectionId(17),
            0.9,
        );
        rule.field_type = Some(FieldType::RadioGroup);

        let mut f = field("form1[0].Section17[0].RadioButtonList[0]");
        assert!(!rule.matches(&f), "type Unknown should not satisfy a radio-group rule");
        f.field_type = FieldType::RadioGroup;
        assert!(rule.matches(&f));
    }

    #[test]
    fn malformed_regex_is_skipped_not_fatal() {
        let table = r#"[
            {"pattern": {"kind": "regex", "value": "SSN\\[(\\d+\\]"}, "section": 4, "confidence": 0.98},
            {"pattern": {"kind": "contains", "value": "SSN"}, "section": 4, "confidence": 0.95}
        ]"#;
        let (rules, warnings) = RuleSet::load(table.as_bytes()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 0);
    }

    #[test]
    fn out_of_range_confidence_is_skipped() {
        let entries = vec![
            RuleEntry {
                pattern: PatternSpec {
                    kind: PatternKind::Contains,
                    value: "SSN".to_string(),
                },
                section: 4,
                subsection: None,
                confidence: 1.5,
                description: String::new(),
                target: RuleTarget::Name,
                field_type: None,
            },
            RuleEntry {
                pattern: PatternSpec {
                    kind: PatternKind::Contains,
                    value: "SSN".to_string(),
                },
                section: 4,
                subsection: None,
                confidence: 0.0,
                description: String::new(),
                target: RuleTarget::Name,
                field_type: None,
            },
        ];
        let (rules, warnings) = RuleSet::from_entries(entries);
        assert!(rules.is_empty());
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn merge_preserves_load_order() {
        let (mut a, _) = RuleSet::load(
            r#"[{"pattern": {"kind": "contains", "value": "SSN"}, "section": 4, "confidence": 0.98}]"#
                .as_bytes(),
        )
        .unwrap();
        let (b, _) = RuleSet::load(
            r#"[{"pattern": {"kind": "prefix", "value": "form1[0].Section17"}, "section": 17, "confidence": 0.93}]"#
                .as_bytes(),
        )
        .unwrap();
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.rules()[0].section, SectionId(4));
        assert_eq!(a.rules()[1].section, SectionId(17));
    }

    #[test]
    fn empty_table_is_valid() {
        let (rules, warnings) = RuleSet::load("[]".as_bytes()).unwrap();
        assert!(rules.is_empty());
        assert!(warnings.is_empty());
    }
}
