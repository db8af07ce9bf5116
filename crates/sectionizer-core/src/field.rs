//! Field descriptors and their categorized assignments.
//!
//! [`FieldDescriptor`] is the immutable input handed over by the upstream
//! PDF introspection layer. [`CategorizedField`] is the derived record the
//! classifier creates and the self-healing loop repairs. Reassignment is a
//! full replacement of section/subsection/confidence/reason — never a
//! partial update — and is refused for explicitly-detected fields.

use serde::{Deserialize, Serialize};

use crate::error::SectionizerError;
use crate::section::SectionId;

/// Widget type of a PDF form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    RadioGroup,
    Checkbox,
    Dropdown,
    Date,
    Signature,
    #[serde(other)]
    Unknown,
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Unknown
    }
}

/// One raw field extracted from the fixed-layout template.
///
/// Names follow the template's dotted/bracketed convention, e.g.
/// `form1[0].Section17[0].RadioButtonList[2]`. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Opaque PDF object reference.
    pub id: String,
    pub name: String,
    pub page: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub value: Option<String>,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, page: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            page,
            label: None,
            field_type: FieldType::Unknown,
            value: None,
        }
    }
}

/// Confidence bucket derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// high ≥ 0.90, medium 0.70–0.89, low < 0.70.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.90 {
            ConfidenceLevel::High
        } else if confidence >= 0.70 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Replacement assignment applied by the self-healing loop.
///
/// Carried as a unit so a reassignment can never partially update a field.
#[derive(Debug, Clone)]
pub struct Reassignment {
    pub section: SectionId,
    pub subsection: Option<String>,
    pub confidence: f64,
    pub reason: String,
}

/// A field with its section assignment and provenance.
///
/// Created once by the classifier; mutated only through [`reassign`]
/// (which the healing loop calls) and never by any other component.
///
/// [`reassign`]: CategorizedField::reassign
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedField {
    #[serde(flatten)]
    pub field: FieldDescriptor,
    pub section: SectionId,
    pub subsection: Option<String>,
    /// Repeated-group index, for sections with per-entry field blocks.
    pub entry: Option<u32>,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    /// Stable composite key (`page-section-name`), when derivable.
    pub unique_id: Option<String>,
    /// Diagnostic for the current assignment; last writer wins.
    pub reason: String,
    pub moved_by_healing: bool,
    /// Protection bit: set once at classification time, never mutated.
    #[serde(rename = "explicitly_detected")]
    explicit: bool,
}

impl CategorizedField {
    /// Build an assignment from a rule match.
    ///
    /// The explicit flag is derived here, exactly once: a match at or above
    /// `explicit_threshold` is treated as authoritative and protected from
    /// any later correction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        field: FieldDescriptor,
        section: SectionId,
        subsection: Option<String>,
        entry: Option<u32>,
        confidence: f64,
        reason: String,
        explicit_threshold: f64,
    ) -> Self {
        let unique_id = section
            .is_classified()
            .then(|| format!("{}-{}-{}", field.page, section.get(), field.name));
        Self {
            field,
            section,
            subsection,
            entry,
            confidence,
            confidence_level: ConfidenceLevel::from_confidence(confidence),
            unique_id,
            reason,
            moved_by_healing: false,
            explicit: confidence >= explicit_threshold,
        }
    }

    /// Build the zero-confidence assignment for a field no rule matched.
    pub fn unclassified(field: FieldDescriptor) -> Self {
        Self {
            field,
            section: SectionId::UNCLASSIFIED,
            subsection: None,
            entry: None,
            confidence: 0.0,
            confidence_level: ConfidenceLevel::Low,
            unique_id: None,
            reason: "no rule matched".to_string(),
            moved_by_healing: false,
            explicit: false,
        }
    }

    /// Whether this assignment is authoritative and protected from healing.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Replace the assignment as a unit.
    ///
    /// Fails for explicitly-detected fields: the protection invariant is
    /// enforced here rather than trusted to callers.
    pub fn reassign(&mut self, r: Reassignment) -> Result<(), SectionizerError> {
        if self.explicit {
            return Err(SectionizerError::ProtectedField {
                id: self.field.id.clone(),
            });
        }
        self.section = r.section;
        self.subsection = r.subsection;
        self.confidence = r.confidence;
        self.confidence_level = ConfidenceLevel::from_confidence(r.confidence);
        self.unique_id = r
            .section
            .is_classified()
            .then(|| format!("{}-{}-{}", self.field.page, r.section.get(), self.field.name));
        self.reason = r.reason;
        self.moved_by_healing = true;
        Ok(())
    }
}

/// One healing reassignment, for the append-only correction log.
#[derive(Debug, Clone, Serialize)]
pub struct Correction {
    pub field_id: String,
    pub field_name: String,
    pub from_section: SectionId,
    pub to_section: SectionId,
    pub reason: String,
    pub iteration: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldDescriptor {
        FieldDescriptor::new("obj-1", name, 7)
    }

    #[test]
    fn confidence_level_buckets() {
        assert_eq!(ConfidenceLevel::from_confidence(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.90), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.89), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.70), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.69), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_confidence(0.0), ConfidenceLevel::Low);
    }

    #[test]
    fn explicit_flag_derived_from_threshold() {
        let high = CategorizedField::new(
            field("form1[0].Section4[0].SSN[0]"),
            SectionId(4),
            None,
            None,
            0.98,
            "ssn pattern".to_string(),
            0.90,
        );
        assert!(high.is_explicit());

        let low = CategorizedField::new(
            field("form1[0].Section4[0].SSN[1]"),
            SectionId(4),
            None,
            None,
            0.75,
            "ssn pattern".to_string(),
            0.90,
        );
        assert!(!low.is_explicit());
    }

    #[test]
    fn unclassified_has_zero_confidence_and_no_protection() {
        let cf = CategorizedField::unclassified(field("form1[0].continuation[3]"));
        assert_eq!(cf.section, SectionId::UNCLASSIFIED);
        assert_eq!(cf.confidence, 0.0);
        assert!(!cf.is_explicit());
        assert!(cf.unique_id.is_none());
    }

    #[test]
    fn reassign_replaces_assignment_as_a_unit() {
        let mut cf = CategorizedField::new(
            field("form1[0].Section4[0].TextField11[2]"),
            SectionId(4),
            Some("4.1".to_string()),
            None,
            0.6,
            "weak match".to_string(),
            0.90,
        );
        cf.reassign(Reassignment {
            section: SectionId(5),
            subsection: None,
            confidence: 0.5,
            reason: "healed into deficit section".to_string(),
        })
        .unwrap();

        assert_eq!(cf.section, SectionId(5));
        assert_eq!(cf.subsection, None);
        assert_eq!(cf.confidence, 0.5);
        assert!(cf.moved_by_healing);
        assert_eq!(cf.reason, "healed into deficit section");
        assert_eq!(cf.unique_id.as_deref(), Some("7-5-form1[0].Section4[0].TextField11[2]"));
    }

    #[test]
    fn reassign_refused_for_explicit_fields() {
        let mut cf = CategorizedField::new(
            field("form1[0].Section17[0].RadioButtonList[0]"),
            SectionId(17),
            None,
            None,
            0.93,
            "section17 prefix".to_string(),
            0.90,
        );
        let err = cf
            .reassign(Reassignment {
                section: SectionId(5),
                subsection: None,
                confidence: 0.5,
                reason: "should not happen".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, SectionizerError::ProtectedField { .. }));
        assert_eq!(cf.section, SectionId(17));
        assert!(!cf.moved_by_healing);
    }

    #[test]
    fn field_type_deserializes_unknown_variants() {
        let f: FieldDescriptor = serde_json::from_str(
            r#"{"id":"x","name":"form1[0].Section9[0].p3-t68[1]","page":3,"type":"barcode"}"#,
        )
        .unwrap();
        assert_eq!(f.field_type, FieldType::Unknown);

        let f: FieldDescriptor = serde_json::from_str(
            r#"{"id":"x","name":"n","page":1,"type":"radio-group"}"#,
        )
        .unwrap();
        assert_eq!(f.field_type, FieldType::RadioGroup);
    }
}
