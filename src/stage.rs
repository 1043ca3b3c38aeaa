//! The fixed, ordered stage catalog of the handout pipeline.
//!
//! | Stage                  | Agent    | Produces                                   |
//! |------------------------|----------|--------------------------------------------|
//! | `first_draft`          | teacher  | Lesson summary drafted from the materials  |
//! | `review`               | reviewer | Critique of the first draft                |
//! | `summary`              | teacher  | Summary revised against the review         |
//! | `handout_draft`        | teacher  | Student handout written from the summary   |
//! | `editing_instructions` | editor   | Editorial corrections for the handout      |
//! | `final_handout`        | teacher  | Handout with the corrections applied       |
//!
//! Declaration order is execution order. `Ord` follows it, so a
//! `BTreeSet<Stage>` iterates in catalog order.

use serde::{Deserialize, Serialize};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FirstDraft,
    Review,
    Summary,
    HandoutDraft,
    EditingInstructions,
    FinalHandout,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::FirstDraft,
        Stage::Review,
        Stage::Summary,
        Stage::HandoutDraft,
        Stage::EditingInstructions,
        Stage::FinalHandout,
    ];

    /// Catalog name, as persisted in the ledger and used in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::FirstDraft => "first_draft",
            Stage::Review => "review",
            Stage::Summary => "summary",
            Stage::HandoutDraft => "handout_draft",
            Stage::EditingInstructions => "editing_instructions",
            Stage::FinalHandout => "final_handout",
        }
    }

    /// Zero-based position in the catalog.
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// This stage and every stage after it.
    pub fn and_following(self) -> &'static [Stage] {
        &Self::ALL[self.index()..]
    }

    pub fn first() -> Stage {
        Self::ALL[0]
    }

    /// Short human-readable label for progress output.
    pub fn description(self) -> &'static str {
        match self {
            Stage::FirstDraft => "Drafting summary from materials",
            Stage::Review => "Reviewing first draft",
            Stage::Summary => "Revising summary",
            Stage::HandoutDraft => "Writing handout",
            Stage::EditingInstructions => "Checking editorial constraints",
            Stage::FinalHandout => "Applying editorial corrections",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                anyhow::anyhow!(
                    "Unknown stage '{}'. Valid values: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_catalog_order() {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "first_draft",
                "review",
                "summary",
                "handout_draft",
                "editing_instructions",
                "final_handout"
            ]
        );
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn test_ord_follows_catalog() {
        let set: BTreeSet<Stage> = [Stage::FinalHandout, Stage::FirstDraft, Stage::Summary]
            .into_iter()
            .collect();
        let ordered: Vec<Stage> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Stage::FirstDraft, Stage::Summary, Stage::FinalHandout]
        );
    }

    #[test]
    fn test_and_following() {
        assert_eq!(
            Stage::HandoutDraft.and_following(),
            &[
                Stage::HandoutDraft,
                Stage::EditingInstructions,
                Stage::FinalHandout
            ]
        );
        assert_eq!(Stage::FirstDraft.and_following().len(), 6);
        assert_eq!(Stage::FinalHandout.and_following(), &[Stage::FinalHandout]);
    }

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!(
            "editing-instructions".parse::<Stage>().unwrap(),
            Stage::EditingInstructions
        );
        assert_eq!("REVIEW".parse::<Stage>().unwrap(), Stage::Review);
    }

    #[test]
    fn test_parse_unknown_lists_valid_values() {
        let err = "proofreading".parse::<Stage>().unwrap_err();
        assert!(err.to_string().contains("Unknown stage 'proofreading'"));
        assert!(err.to_string().contains("final_handout"));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Stage::HandoutDraft).unwrap();
        assert_eq!(json, "\"handout_draft\"");
        let back: Stage = serde_json::from_str("\"final_handout\"").unwrap();
        assert_eq!(back, Stage::FinalHandout);
    }
}
