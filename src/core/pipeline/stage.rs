//! Pipeline stage state machine

use crate::domain::TierflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a pipeline run
///
/// Stages run strictly in declaration order; [`Stage::next`] gives the
/// successor and [`Stage::Done`] is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Scan the source file
    Extract,
    /// Write the extracted batch to the raw bucket
    StageAWrite,
    /// Read the raw object back
    StageBRead,
    /// Rename columns
    Transform,
    /// Write the renamed batch to the processed bucket
    StageBWrite,
    /// Read the processed object
    StageCRead,
    /// Replace the relational table contents
    StageCUpsert,
    /// Export the relational table
    StageDRead,
    /// Write the export to the cloud bucket
    StageDWrite,
    /// Read the cloud object
    StageERead,
    /// Write the archive copy back to staging
    StageEWrite,
    /// Terminal state
    Done,
}

impl Stage {
    /// Every stage in run order
    pub const ALL: [Stage; 12] = [
        Stage::Extract,
        Stage::StageAWrite,
        Stage::StageBRead,
        Stage::Transform,
        Stage::StageBWrite,
        Stage::StageCRead,
        Stage::StageCUpsert,
        Stage::StageDRead,
        Stage::StageDWrite,
        Stage::StageERead,
        Stage::StageEWrite,
        Stage::Done,
    ];

    /// The stage that follows this one
    pub fn next(self) -> Stage {
        match self {
            Stage::Extract => Stage::StageAWrite,
            Stage::StageAWrite => Stage::StageBRead,
            Stage::StageBRead => Stage::Transform,
            Stage::Transform => Stage::StageBWrite,
            Stage::StageBWrite => Stage::StageCRead,
            Stage::StageCRead => Stage::StageCUpsert,
            Stage::StageCUpsert => Stage::StageDRead,
            Stage::StageDRead => Stage::StageDWrite,
            Stage::StageDWrite => Stage::StageERead,
            Stage::StageERead => Stage::StageEWrite,
            Stage::StageEWrite | Stage::Done => Stage::Done,
        }
    }

    /// Name used in logs and events
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "Extract",
            Stage::StageAWrite => "StageA_write",
            Stage::StageBRead => "StageB_read",
            Stage::Transform => "Transform",
            Stage::StageBWrite => "StageB_write",
            Stage::StageCRead => "StageC_read",
            Stage::StageCUpsert => "StageC_upsert",
            Stage::StageDRead => "StageD_read",
            Stage::StageDWrite => "StageD_write",
            Stage::StageERead => "StageE_read",
            Stage::StageEWrite => "StageE_write",
            Stage::Done => "Done",
        }
    }

    /// Whether this is the terminal state
    pub fn is_done(self) -> bool {
        self == Stage::Done
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = TierflowError;

    /// Accepts stage names (`StageC_read`) and tier shorthands (`stage-c`),
    /// case-insensitively, with `-` and `_` interchangeable
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let stage = match normalized.as_str() {
            "extract" | "stage_a" => Stage::Extract,
            "stage_b" => Stage::StageBRead,
            "stage_c" => Stage::StageCRead,
            "stage_d" => Stage::StageDRead,
            "stage_e" => Stage::StageERead,
            other => Stage::ALL
                .into_iter()
                .find(|stage| stage.name().to_ascii_lowercase() == other)
                .ok_or_else(|| {
                    TierflowError::Configuration(format!(
                        "Unknown stage '{s}'. Expected one of: extract, stage-a, stage-b, \
                         transform, stage-c, stage-d, stage-e"
                    ))
                })?,
        };
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_next_walks_every_stage_in_order() {
        let mut stage = Stage::Extract;
        let mut visited = vec![stage];
        while !stage.is_done() {
            stage = stage.next();
            visited.push(stage);
        }
        assert_eq!(visited, Stage::ALL.to_vec());
        assert_eq!(Stage::Done.next(), Stage::Done);
    }

    #[test_case("stage-c", Stage::StageCRead ; "tier shorthand")]
    #[test_case("STAGE_E", Stage::StageERead ; "upper case shorthand")]
    #[test_case("StageC_upsert", Stage::StageCUpsert ; "stage name")]
    #[test_case("stagec-upsert", Stage::StageCUpsert ; "dashed stage name")]
    #[test_case("transform", Stage::Transform ; "transform")]
    #[test_case("stage-a", Stage::Extract ; "tier a starts at extract")]
    fn test_from_str(input: &str, expected: Stage) {
        assert_eq!(input.parse::<Stage>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "stage-z".parse::<Stage>().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_display_round_trips() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
    }
}
