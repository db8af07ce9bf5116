//! Pipeline configuration.
//!
//! The thresholds here were tuned against reference extractions of the
//! template; they are configuration, not hard requirements.

/// Tunables shared by the classifier and the healing loop.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Matches at or above this confidence are explicit: authoritative and
    /// permanently protected from healing.
    pub explicit_threshold: f64,
    /// Iteration budget for the healing loop.
    pub max_iterations: u32,
    /// Confidence recorded for fields moved by healing without a supporting
    /// rule match (name-token or page-proximity evidence only).
    pub healed_confidence: f64,
    /// How far outside a section's known page range a candidate may sit and
    /// still count as page-proximate.
    pub page_tolerance: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            explicit_threshold: 0.90,
            max_iterations: 10,
            healed_confidence: 0.50,
            page_tolerance: 1,
        }
    }
}
