mod config;
pub mod eligibility;
mod rules;

pub use config::{
    MatchingConfig, Normalization, ScoreWeights, COURSE_WEIGHTS,
    DEFAULT_MAX_PENDING_PER_INSTITUTION, JOB_WEIGHTS,
};
pub use eligibility::{check, is_eligible, EligibilityReport, IneligibilityReason};

use super::domain::{CandidateProfile, MatchPath, Opening, RequirementSet};
use serde::{Deserialize, Serialize};

/// Compatibility score in `0..=100` for one candidate against one requirement set.
pub fn score(
    candidate: &CandidateProfile,
    requirements: &RequirementSet,
    weights: &ScoreWeights,
) -> u8 {
    rules::score_profile(candidate, requirements, weights).1
}

/// Stateless matcher applying the configured weights per match path.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    config: MatchingConfig,
}

impl MatchEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn breakdown(&self, candidate: &CandidateProfile, opening: &Opening) -> MatchBreakdown {
        let path = opening.target.path();
        let weights = self.config.weights_for(path);
        let (components, score) = rules::score_profile(candidate, &opening.requirements, weights);
        MatchBreakdown {
            path,
            score,
            components,
            advisories: rules::education_advisory(candidate, &opening.requirements)
                .into_iter()
                .collect(),
        }
    }

    pub fn score(&self, candidate: &CandidateProfile, opening: &Opening) -> u8 {
        self.breakdown(candidate, opening).score
    }

    pub fn eligibility(
        &self,
        candidate: &CandidateProfile,
        opening: &Opening,
    ) -> EligibilityReport {
        eligibility::check(candidate, &opening.requirements, opening.target.path())
    }
}

/// Criteria contributing to a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    Field,
    Gpa,
    Experience,
    Skills,
    Subjects,
}

/// One applied criterion and the points it earned out of its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: MatchCriterion,
    pub earned: f32,
    pub possible: f32,
    pub notes: String,
}

/// Score plus the per-criterion trail used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub path: MatchPath,
    pub score: u8,
    pub components: Vec<ScoreComponent>,
    #[serde(default)]
    pub advisories: Vec<String>,
}
