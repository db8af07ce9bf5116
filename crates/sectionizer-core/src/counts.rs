//! Reference counts: expected per-section field/entry/subsection totals.
//!
//! The table is ground truth for the healing loop's convergence measure. It
//! was built from known-good extractions of the template; the builtin copy
//! is a versionable data table, editable without touching match logic.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::SectionizerError;
use crate::section::SectionId;

/// Expected totals for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ExpectedCounts {
    #[serde(default)]
    pub fields: u32,
    #[serde(default)]
    pub entries: u32,
    #[serde(default)]
    pub subsections: u32,
    /// Inclusive page range the section occupies in the template, when known.
    #[serde(default)]
    pub pages: Option<(u32, u32)>,
}

/// One row of a reference table file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceRow {
    pub section: u8,
    #[serde(flatten)]
    pub counts: ExpectedCounts,
}

/// Expected counts keyed by section.
///
/// Sections absent from the table behave as `expected = 0`: anything
/// observed there is automatically surplus. Absence is soft; only a table
/// with no rows at all is a hard failure (checked by the pipeline).
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    by_section: HashMap<SectionId, ExpectedCounts>,
}

impl ReferenceTable {
    pub fn from_rows(rows: Vec<ReferenceRow>) -> Self {
        let by_section = rows
            .into_iter()
            .map(|row| (SectionId(row.section), row.counts))
            .collect();
        Self { by_section }
    }

    /// Load a JSON table (array of `{section, fields, entries, subsections,
    /// pages}` rows).
    pub fn load(reader: impl Read) -> Result<Self, SectionizerError> {
        let rows: Vec<ReferenceRow> = serde_json::from_reader(reader)?;
        Ok(Self::from_rows(rows))
    }

    /// Expected counts for a section; zero for sections not in the table.
    pub fn expected(&self, section: SectionId) -> ExpectedCounts {
        self.by_section.get(&section).copied().unwrap_or_default()
    }

    /// Known page range for a section, if the table records one.
    pub fn page_range(&self, section: SectionId) -> Option<(u32, u32)> {
        self.by_section.get(&section).and_then(|c| c.pages)
    }

    pub fn is_empty(&self) -> bool {
        self.by_section.is_empty()
    }

    /// Sections present in the table, ascending.
    pub fn sections(&self) -> Vec<SectionId> {
        let mut sections: Vec<_> = self.by_section.keys().copied().collect();
        sections.sort();
        sections
    }

    /// The known-good table for the thirty-section template.
    pub fn builtin() -> Self {
        let rows = BUILTIN
            .iter()
            .map(|&(section, fields, entries, subsections, first, last)| ReferenceRow {
                section,
                counts: ExpectedCounts {
                    fields,
                    entries,
                    subsections,
                    pages: Some((first, last)),
                },
            })
            .collect();
        Self::from_rows(rows)
    }
}

/// (section, fields, entries, subsections, first page, last page), from the
/// reference extraction audits of the template.
const BUILTIN: &[(u8, u32, u32, u32, u32, u32)] = &[
    (1, 5, 1, 0, 5, 5),
    (2, 3, 1, 0, 5, 5),
    (3, 5, 1, 0, 5, 5),
    (4, 4, 1, 0, 5, 5),
    (5, 45, 4, 1, 6, 7),
    (6, 8, 1, 0, 7, 7),
    (7, 18, 1, 0, 8, 8),
    (8, 12, 1, 1, 9, 9),
    (9, 78, 4, 4, 10, 12),
    (10, 36, 2, 1, 13, 14),
    (11, 120, 4, 1, 15, 19),
    (12, 150, 4, 1, 20, 24),
    (13, 1086, 15, 6, 25, 49),
    (14, 6, 1, 0, 50, 50),
    (15, 90, 4, 3, 51, 55),
    (16, 208, 4, 2, 56, 59),
    (17, 220, 3, 3, 60, 66),
    (18, 964, 18, 2, 67, 85),
    (19, 277, 4, 1, 86, 92),
    (20, 790, 10, 3, 93, 107),
    (21, 486, 8, 5, 108, 113),
    (22, 452, 7, 3, 114, 120),
    (23, 191, 6, 3, 121, 123),
    (24, 137, 4, 2, 124, 126),
    (25, 79, 3, 1, 127, 128),
    (26, 237, 8, 5, 129, 132),
    (27, 57, 3, 1, 133, 133),
    (28, 44, 2, 1, 134, 134),
    (29, 141, 5, 5, 135, 135),
    (30, 25, 1, 0, 136, 136),
];
