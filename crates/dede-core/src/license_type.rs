//! # License Type Tag
//!
//! The four request variants of the licensing process. The variants are
//! structurally identical at the workflow level — one engine handles all
//! four — and differ only in their domain payload, which lives with the
//! request record in `dede-engine`.

use serde::{Deserialize, Serialize};

/// Which of the four license request variants a record belongs to.
///
/// Used as a routing tag throughout the engine: request storage, task
/// assignments, reminders, and flow-log entries all carry it so that a
/// request id can be resolved back to the right record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    /// First-time energy-production permit.
    New,
    /// Renewal of an expiring permit.
    Renewal,
    /// Capacity extension of an active permit.
    Extension,
    /// Capacity reduction of an active permit.
    Reduction,
}

impl LicenseType {
    /// All variants, in a fixed order.
    pub const ALL: [LicenseType; 4] = [
        LicenseType::New,
        LicenseType::Renewal,
        LicenseType::Extension,
        LicenseType::Reduction,
    ];

    /// Return the canonical snake_case string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Renewal => "renewal",
            Self::Extension => "extension",
            Self::Reduction => "reduction",
        }
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_snake_case() {
        let json = serde_json::to_string(&LicenseType::Extension).unwrap();
        assert_eq!(json, "\"extension\"");
    }
}
