use std::collections::BTreeSet;

use super::domain::{CandidateProfile, Opening, OfferTarget};

pub const MAX_GPA: f32 = 4.0;

/// Input errors raised before any store call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    MissingField { field: &'static str },
    #[error("gpa must be between 0 and {max} (found {found})")]
    GpaOutOfRange { found: f32, max: f32 },
    #[error("minimum gpa must be between 0 and {max} (found {found})")]
    MinimumGpaOutOfRange { found: f32, max: f32 },
    #[error("skill names must not be blank")]
    BlankSkill,
    #[error("subject names must not be blank")]
    BlankSubject,
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}

fn gpa_in_range(gpa: f32) -> bool {
    gpa.is_finite() && (0.0..=MAX_GPA).contains(&gpa)
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn validate_target(target: &OfferTarget) -> Result<(), ValidationError> {
    match target {
        OfferTarget::Course {
            institution_id,
            course_id,
        } => {
            require(institution_id, "institution_id")?;
            require(course_id, "course_id")
        }
        OfferTarget::Job { company_id, job_id } => {
            require(company_id, "company_id")?;
            require(job_id, "job_id")
        }
    }
}

/// Check a candidate-submitted profile and return it with trimmed text fields.
pub fn sanitize_profile(profile: CandidateProfile) -> Result<CandidateProfile, ValidationError> {
    require(&profile.candidate_id.0, "candidate_id")?;

    if let Some(gpa) = profile.gpa {
        if !gpa_in_range(gpa) {
            return Err(ValidationError::GpaOutOfRange {
                found: gpa,
                max: MAX_GPA,
            });
        }
    }

    let mut skills = BTreeSet::new();
    for skill in profile.skills {
        let skill = skill.trim().to_string();
        if skill.is_empty() {
            return Err(ValidationError::BlankSkill);
        }
        skills.insert(skill);
    }

    if profile
        .subject_grades
        .keys()
        .any(|subject| subject.trim().is_empty())
    {
        return Err(ValidationError::BlankSubject);
    }

    Ok(CandidateProfile {
        skills,
        field_of_study: trimmed_optional(profile.field_of_study),
        ..profile
    })
}

/// Check an institution/company opening before it is published.
pub fn sanitize_opening(opening: Opening) -> Result<Opening, ValidationError> {
    validate_target(&opening.target)?;
    require(&opening.title, "title")?;

    let mut requirements = opening.requirements;
    if let Some(min_gpa) = requirements.min_gpa {
        if !gpa_in_range(min_gpa) {
            return Err(ValidationError::MinimumGpaOutOfRange {
                found: min_gpa,
                max: MAX_GPA,
            });
        }
    }

    let mut skills = Vec::with_capacity(requirements.skills.len());
    for skill in requirements.skills {
        let skill = skill.trim().to_string();
        if skill.is_empty() {
            return Err(ValidationError::BlankSkill);
        }
        if !skills.contains(&skill) {
            skills.push(skill);
        }
    }
    requirements.skills = skills;

    if requirements
        .subject_grades
        .keys()
        .any(|subject| subject.trim().is_empty())
    {
        return Err(ValidationError::BlankSubject);
    }
    requirements.field = trimmed_optional(requirements.field);

    Ok(Opening {
        target: opening.target,
        title: opening.title.trim().to_string(),
        requirements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::placement::domain::{CandidateId, RequirementSet};

    #[test]
    fn rejects_gpa_outside_scale() {
        let mut profile = CandidateProfile::new(CandidateId("cand-1".to_string()));
        profile.gpa = Some(4.3);

        match sanitize_profile(profile) {
            Err(ValidationError::GpaOutOfRange { found, .. }) => assert_eq!(found, 4.3),
            other => panic!("expected gpa range error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_candidate_id() {
        let profile = CandidateProfile::new(CandidateId("  ".to_string()));
        assert_eq!(
            sanitize_profile(profile),
            Err(ValidationError::MissingField {
                field: "candidate_id"
            })
        );
    }

    #[test]
    fn trims_skills_and_field() {
        let mut profile = CandidateProfile::new(CandidateId("cand-1".to_string()));
        profile.skills.insert(" SQL ".to_string());
        profile.skills.insert("SQL".to_string());
        profile.field_of_study = Some("   ".to_string());

        let sanitized = sanitize_profile(profile).expect("profile is valid");
        assert_eq!(sanitized.skills.len(), 1);
        assert!(sanitized.skills.contains("SQL"));
        assert_eq!(sanitized.field_of_study, None);
    }

    #[test]
    fn opening_requires_title_and_sane_minimum() {
        let opening = Opening {
            target: OfferTarget::job("acme", "job-1"),
            title: "Data Analyst".to_string(),
            requirements: RequirementSet {
                min_gpa: Some(-1.0),
                ..RequirementSet::default()
            },
        };
        assert!(matches!(
            sanitize_opening(opening.clone()),
            Err(ValidationError::MinimumGpaOutOfRange { .. })
        ));

        let untitled = Opening {
            title: String::new(),
            requirements: RequirementSet::default(),
            ..opening
        };
        assert_eq!(
            sanitize_opening(untitled),
            Err(ValidationError::MissingField { field: "title" })
        );
    }
}
