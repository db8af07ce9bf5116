pub mod config;
pub mod counts;
pub mod error;
pub mod field;
pub mod rules;
pub mod section;

pub use config::PipelineConfig;
pub use counts::{ExpectedCounts, ReferenceTable};
pub use error::SectionizerError;
pub use field::{CategorizedField, ConfidenceLevel, Correction, FieldDescriptor, FieldType, Reassignment};
pub use rules::{MatchRule, FieldPattern, RuleLoadWarning, RuleSet};
pub use section::SectionId;
