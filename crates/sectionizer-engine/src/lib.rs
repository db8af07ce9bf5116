pub mod classifier;
pub mod engine;
pub mod healing;
pub mod pipeline;
pub mod report;

pub use classifier::classify_all;
pub use engine::{MatchResult, RuleIndex, RuleMatch};
pub use healing::{HealingManager, HealingRun, HealingStatus};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use report::Report;
