use serde::{Deserialize, Serialize};

use super::super::domain::{CandidateProfile, LetterGrade, MatchPath, RequirementSet};
use super::rules::fields_overlap;

/// Hard cutoff that blocked an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibilityReason {
    GpaBelowMinimum {
        required: f32,
        actual: f32,
    },
    FieldMismatch {
        required: String,
        actual: String,
    },
    SubjectGradeBelowMinimum {
        subject: String,
        required: LetterGrade,
        actual: LetterGrade,
    },
    SubjectMissing {
        subject: String,
        required: LetterGrade,
    },
}

impl IneligibilityReason {
    pub fn summary(&self) -> String {
        match self {
            IneligibilityReason::GpaBelowMinimum { required, actual } => {
                format!("gpa {actual:.2} is below the required {required:.2}")
            }
            IneligibilityReason::FieldMismatch { required, actual } => {
                format!("field of study '{actual}' does not match required '{required}'")
            }
            IneligibilityReason::SubjectGradeBelowMinimum {
                subject,
                required,
                actual,
            } => format!("{subject} grade {actual} is below the required {required}"),
            IneligibilityReason::SubjectMissing { subject, required } => {
                format!("{subject} (minimum {required}) has no recorded grade")
            }
        }
    }
}

/// Result of the eligibility gate. Ineligible is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    pub failures: Vec<IneligibilityReason>,
}

impl EligibilityReport {
    pub fn reasons(&self) -> Vec<String> {
        self.failures.iter().map(IneligibilityReason::summary).collect()
    }
}

pub fn check(
    candidate: &CandidateProfile,
    requirements: &RequirementSet,
    path: MatchPath,
) -> EligibilityReport {
    let mut failures = Vec::new();

    if let Some(required) = requirements.min_gpa {
        let actual = candidate.effective_gpa();
        if actual < required {
            failures.push(IneligibilityReason::GpaBelowMinimum { required, actual });
        }
    }

    if path == MatchPath::Job {
        let required = requirements.field.as_deref().map(str::trim);
        let actual = candidate.field_of_study.as_deref().map(str::trim);
        if let (Some(required), Some(actual)) = (required, actual) {
            if !required.is_empty() && !actual.is_empty() && !fields_overlap(actual, required) {
                failures.push(IneligibilityReason::FieldMismatch {
                    required: required.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
    }

    if path == MatchPath::Course {
        for (subject, required) in &requirements.subject_grades {
            match candidate.subject_grades.get(subject) {
                Some(actual) if actual.points() >= required.points() => {}
                Some(actual) => failures.push(IneligibilityReason::SubjectGradeBelowMinimum {
                    subject: subject.clone(),
                    required: *required,
                    actual: *actual,
                }),
                None => failures.push(IneligibilityReason::SubjectMissing {
                    subject: subject.clone(),
                    required: *required,
                }),
            }
        }
    }

    EligibilityReport {
        eligible: failures.is_empty(),
        failures,
    }
}

pub fn is_eligible(
    candidate: &CandidateProfile,
    requirements: &RequirementSet,
    path: MatchPath,
) -> bool {
    check(candidate, requirements, path).eligible
}
