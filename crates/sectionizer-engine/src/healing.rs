//! The self-healing loop.
//!
//! Reconciles observed per-section field counts against the reference
//! table: Initialize → Measure → SelectCandidates → Reassign → Measure …
//! until deviation reaches zero, no further candidates exist, or the
//! iteration budget runs out.
//!
//! Candidate selection only ever drains surplus sections (observed >
//! expected), never below their expected count, and only fills deficit
//! sections up to theirs — so every applied move reduces total deviation
//! by two and the loop is monotone. Explicitly-detected fields are never
//! candidates; that protection is what keeps the loop from oscillating on
//! confidently-matched fields.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use sectionizer_core::{
    CategorizedField, Correction, PipelineConfig, Reassignment, ReferenceTable, SectionId,
    SectionizerError,
};

use crate::engine::RuleIndex;

/// How a healing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealingStatus {
    /// Zero deviation, or no candidate moves for what remains.
    Converged,
    /// Iteration budget spent; the run is partial, not failed.
    Exhausted,
}

impl HealingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealingStatus::Converged => "converged",
            HealingStatus::Exhausted => "partial",
        }
    }
}

/// Per-iteration measurement, kept for the report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IterationStats {
    pub iteration: u32,
    /// Total deviation measured at the start of the iteration.
    pub total_deviation: u32,
    pub moves: usize,
}

/// Outcome of one healing run.
#[derive(Debug)]
pub struct HealingRun {
    pub fields: Vec<CategorizedField>,
    /// Append-only audit trail of every reassignment.
    pub corrections: Vec<Correction>,
    pub status: HealingStatus,
    pub iterations: u32,
    pub total_deviation: u32,
    pub trace: Vec<IterationStats>,
}

struct PlannedMove {
    field_index: usize,
    reassignment: Reassignment,
}

/// Iterative correction of a classified assignment.
pub struct HealingManager<'a> {
    reference: &'a ReferenceTable,
    index: &'a RuleIndex,
    config: &'a PipelineConfig,
}

impl<'a> HealingManager<'a> {
    pub fn new(
        reference: &'a ReferenceTable,
        index: &'a RuleIndex,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            reference,
            index,
            config,
        }
    }

    /// Run the loop to convergence or budget exhaustion.
    ///
    /// Reassignment moves fields between sections, never creates or
    /// destroys them: the returned list has exactly the input length.
    pub fn heal(&self, mut fields: Vec<CategorizedField>) -> Result<HealingRun, SectionizerError> {
        let mut corrections: Vec<Correction> = Vec::new();
        let mut trace = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            let observed = observed_counts(&fields);
            let total = self.total_deviation(&observed);
            if total == 0 {
                info!(iteration, "healing converged: zero deviation");
                return Ok(HealingRun {
                    fields,
                    corrections,
                    status: HealingStatus::Converged,
                    iterations: iteration - 1,
                    total_deviation: 0,
                    trace,
                });
            }

            let moves = self.select_candidates(&fields, &observed);
            if moves.is_empty() {
                info!(
                    iteration,
                    total_deviation = total,
                    "healing converged: no candidates for remaining deviation"
                );
                return Ok(HealingRun {
                    fields,
                    corrections,
                    status: HealingStatus::Converged,
                    iterations: iteration - 1,
                    total_deviation: total,
                    trace,
                });
            }

            // Selection read a stable snapshot; all moves commit together
            // before the next Measure.
            let move_count = moves.len();
            for mv in moves {
                let field = &mut fields[mv.field_index];
                let from = field.section;
                let to = mv.reassignment.section;
                let reason = mv.reassignment.reason.clone();
                field.reassign(mv.reassignment)?;
                corrections.push(Correction {
                    field_id: field.field.id.clone(),
                    field_name: field.field.name.clone(),
                    from_section: from,
                    to_section: to,
                    reason,
                    iteration,
                });
            }
            debug!(iteration, moves = move_count, total_deviation = total, "applied healing moves");
            trace.push(IterationStats {
                iteration,
                total_deviation: total,
                moves: move_count,
            });
        }

        let observed = observed_counts(&fields);
        let total = self.total_deviation(&observed);
        let status = if total == 0 {
            HealingStatus::Converged
        } else {
            info!(
                total_deviation = total,
                "healing exhausted its iteration budget; run is partial"
            );
            HealingStatus::Exhausted
        };
        Ok(HealingRun {
            fields,
            corrections,
            status,
            iterations: self.config.max_iterations,
            total_deviation: total,
            trace,
        })
    }

    /// Σ|observed − expected| over every section seen or expected.
    fn total_deviation(&self, observed: &HashMap<SectionId, u32>) -> u32 {
        let mut sections: BTreeSet<SectionId> = self.reference.sections().into_iter().collect();
        sections.extend(observed.keys().copied());
        sections
            .iter()
            .map(|&s| {
                let obs = i64::from(observed.get(&s).copied().unwrap_or(0));
                let exp = i64::from(self.reference.expected(s).fields);
                (obs - exp).unsigned_abs() as u32
            })
            .sum()
    }

    /// One iteration's worth of moves, surplus → deficit.
    ///
    /// Deficits are visited in section order; each takes the lowest-
    /// confidence non-explicit fields from surplus sections (unclassified
    /// bucket first), and only when a secondary signal supports the move.
    fn select_candidates(
        &self,
        fields: &[CategorizedField],
        observed: &HashMap<SectionId, u32>,
    ) -> Vec<PlannedMove> {
        let mut surplus: Vec<SectionId> = Vec::new();
        let mut deficits: Vec<(SectionId, u32)> = Vec::new();
        let mut sections: BTreeSet<SectionId> = self.reference.sections().into_iter().collect();
        sections.extend(observed.keys().copied());

        let mut available: HashMap<SectionId, u32> = HashMap::new();
        for &s in &sections {
            let obs = observed.get(&s).copied().unwrap_or(0);
            let exp = self.reference.expected(s).fields;
            if obs > exp {
                surplus.push(s);
                available.insert(s, obs - exp);
            } else if obs < exp {
                deficits.push((s, exp - obs));
            }
        }

        let mut moves = Vec::new();
        let mut taken: HashSet<usize> = HashSet::new();

        for (deficit, mut need) in deficits {
            let page_range = self.deficit_page_range(deficit, fields);

            for &source in &surplus {
                if need == 0 {
                    break;
                }
                let mut candidates: Vec<usize> = fields
                    .iter()
                    .enumerate()
                    .filter(|(i, f)| {
                        f.section == source && !f.is_explicit() && !taken.contains(i)
                    })
                    .map(|(i, _)| i)
                    .collect();
                candidates.sort_by(|&a, &b| {
                    fields[a]
                        .confidence
                        .total_cmp(&fields[b].confidence)
                        .then(a.cmp(&b))
                });

                for i in candidates {
                    if need == 0 {
                        break;
                    }
                    let left = available.get(&source).copied().unwrap_or(0);
                    if left == 0 {
                        break;
                    }
                    if let Some(reassignment) = self.support(&fields[i], deficit, page_range) {
                        moves.push(PlannedMove {
                            field_index: i,
                            reassignment,
                        });
                        taken.insert(i);
                        need -= 1;
                        if let Some(v) = available.get_mut(&source) {
                            *v -= 1;
                        }
                    }
                }
            }
        }

        moves
    }

    /// Secondary signal supporting a move into a deficit section, checked
    /// in order: lower-ranked rule match, section token in the name, page
    /// proximity to the section's known range.
    fn support(
        &self,
        field: &CategorizedField,
        deficit: SectionId,
        page_range: Option<(u32, u32)>,
    ) -> Option<Reassignment> {
        if let Some(m) = self.index.match_for_section(&field.field, deficit) {
            return Some(Reassignment {
                section: deficit,
                subsection: m.subsection,
                confidence: m.confidence,
                reason: format!("healing: secondary rule match ({})", m.reason),
            });
        }

        if name_mentions(&field.field.name, deficit) {
            return Some(Reassignment {
                section: deficit,
                subsection: None,
                confidence: self.config.healed_confidence,
                reason: format!("healing: name contains {}", deficit.name_token()),
            });
        }

        if let Some((first, last)) = page_range {
            let tolerance = self.config.page_tolerance;
            let page = field.field.page;
            if page + tolerance >= first && page <= last + tolerance {
                return Some(Reassignment {
                    section: deficit,
                    subsection: None,
                    confidence: self.config.healed_confidence,
                    reason: format!("healing: page {page} within {deficit} range"),
                });
            }
        }

        None
    }

    /// Known page range for a deficit section: from the reference table, or
    /// the span of the section's explicitly-detected fields.
    fn deficit_page_range(
        &self,
        section: SectionId,
        fields: &[CategorizedField],
    ) -> Option<(u32, u32)> {
        self.reference.page_range(section).or_else(|| {
            let pages: Vec<u32> = fields
                .iter()
                .filter(|f| f.section == section && f.is_explicit())
                .map(|f| f.field.page)
                .collect();
            match (pages.iter().min(), pages.iter().max()) {
                (Some(&first), Some(&last)) => Some((first, last)),
                _ => None,
            }
        })
    }
}

/// Observed field count per section for the current assignment.
pub fn observed_counts(fields: &[CategorizedField]) -> HashMap<SectionId, u32> {
    let mut counts: HashMap<SectionId, u32> = HashMap::new();
    for field in fields {
        *counts.entry(field.section).or_insert(0) += 1;
    }
    counts
}

/// Whether a raw field name mentions a section's token.
///
/// The token must be followed by `[` or `_` so that "Section1" does not
/// match Section17 or Section16_3 fields.
fn name_mentions(name: &str, section: SectionId) -> bool {
    let token = section.name_token();
    name.match_indices(token.as_str()).any(|(i, _)| {
        matches!(name.as_bytes().get(i + token.len()), Some(b'[') | Some(b'_'))
    })
}
