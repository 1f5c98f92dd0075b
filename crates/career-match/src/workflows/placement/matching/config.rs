use serde::{Deserialize, Serialize};

use super::super::domain::MatchPath;

/// How skipped criteria affect the score denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Earned points over the full weight total; skipped criteria earn nothing.
    Fixed,
    /// Earned points over the weights of the criteria that applied.
    Renormalized,
}

/// Per-criterion point allocation for one match path. Weights sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub field: u8,
    pub gpa: u8,
    pub experience: u8,
    pub skills: u8,
    pub subjects: u8,
    pub normalization: Normalization,
}

impl ScoreWeights {
    pub const fn total(&self) -> u16 {
        self.field as u16
            + self.gpa as u16
            + self.experience as u16
            + self.skills as u16
            + self.subjects as u16
    }
}

pub const JOB_WEIGHTS: ScoreWeights = ScoreWeights {
    field: 60,
    gpa: 20,
    experience: 10,
    skills: 10,
    subjects: 0,
    normalization: Normalization::Fixed,
};

pub const COURSE_WEIGHTS: ScoreWeights = ScoreWeights {
    field: 30,
    gpa: 40,
    experience: 0,
    skills: 0,
    subjects: 30,
    normalization: Normalization::Renormalized,
};

pub const DEFAULT_MAX_PENDING_PER_INSTITUTION: usize = 2;

/// Matching rubric and intake limits shared by the placement service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub course_weights: ScoreWeights,
    pub job_weights: ScoreWeights,
    pub max_pending_per_institution: usize,
}

impl MatchingConfig {
    pub fn weights_for(&self, path: MatchPath) -> &ScoreWeights {
        match path {
            MatchPath::Course => &self.course_weights,
            MatchPath::Job => &self.job_weights,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            course_weights: COURSE_WEIGHTS,
            job_weights: JOB_WEIGHTS,
            max_pending_per_institution: DEFAULT_MAX_PENDING_PER_INSTITUTION,
        }
    }
}
