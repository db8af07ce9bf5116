//! Section identifiers for the thirty-section form template.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the form's thirty top-level logical groupings.
///
/// Section 0 is the sentinel "unclassified" bucket: fields that no rule
/// matched, and the target of rules declared in the default rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u8);

impl SectionId {
    /// Number of real sections in the template.
    pub const COUNT: u8 = 30;

    /// The sentinel bucket for fields with no assignment.
    pub const UNCLASSIFIED: SectionId = SectionId(0);

    pub fn new(n: u8) -> Self {
        SectionId(n)
    }

    /// True for a real section (1–30), false for the sentinel bucket.
    pub fn is_classified(&self) -> bool {
        self.0 != 0
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// The `SectionN` token that appears inside raw PDF field names,
    /// e.g. `form1[0].Section17[0].RadioButtonList[2]`.
    pub fn name_token(&self) -> String {
        format!("Section{}", self.0)
    }

    /// Iterate over all real sections in ascending order.
    pub fn all() -> impl Iterator<Item = SectionId> {
        (1..=Self::COUNT).map(SectionId)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_classified() {
            write!(f, "section {}", self.0)
        } else {
            write!(f, "unclassified")
        }
    }
}
