use super::super::domain::{CandidateProfile, RequirementSet};
use super::config::{Normalization, ScoreWeights};
use super::{MatchCriterion, ScoreComponent};

/// Case-insensitive substring test in either direction. Blank strings never match.
pub(crate) fn fields_overlap(left: &str, right: &str) -> bool {
    let left = left.trim().to_lowercase();
    let right = right.trim().to_lowercase();
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left.contains(&right) || right.contains(&left)
}

/// Note for a requirement that is shown to the candidate but never gates or scores.
pub(crate) fn education_advisory(
    candidate: &CandidateProfile,
    requirements: &RequirementSet,
) -> Option<String> {
    let required = requirements.education_level?;
    match candidate.education_level {
        Some(actual) if actual >= required => None,
        Some(actual) => Some(format!(
            "education level {} is below the preferred {}",
            actual.label(),
            required.label()
        )),
        None => Some(format!(
            "education level not recorded (preferred {})",
            required.label()
        )),
    }
}

fn proportional(actual: f32, minimum: f32, weight: f32) -> f32 {
    if actual >= minimum {
        weight
    } else {
        (actual / minimum).clamp(0.0, 1.0) * weight
    }
}

pub(crate) fn score_profile(
    candidate: &CandidateProfile,
    requirements: &RequirementSet,
    weights: &ScoreWeights,
) -> (Vec<ScoreComponent>, u8) {
    let mut components = Vec::new();

    if weights.field > 0 {
        if let Some(required) = requirements
            .field
            .as_deref()
            .filter(|field| !field.trim().is_empty())
        {
            let possible = f32::from(weights.field);
            let matched = candidate
                .field_of_study
                .as_deref()
                .map(|field| fields_overlap(field, required))
                .unwrap_or(false);
            components.push(ScoreComponent {
                criterion: MatchCriterion::Field,
                earned: if matched { possible } else { 0.0 },
                possible,
                notes: if matched {
                    format!("field of study matches '{required}'")
                } else {
                    format!("field of study does not match '{required}'")
                },
            });
        }
    }

    if weights.gpa > 0 {
        if let Some(min_gpa) = requirements.min_gpa.filter(|gpa| *gpa > 0.0) {
            let possible = f32::from(weights.gpa);
            let gpa = candidate.effective_gpa();
            components.push(ScoreComponent {
                criterion: MatchCriterion::Gpa,
                earned: proportional(gpa, min_gpa, possible),
                possible,
                notes: format!("gpa {gpa:.2} against minimum {min_gpa:.2}"),
            });
        }
    }

    if weights.experience > 0 {
        if let Some(min_years) = requirements.min_experience_years.filter(|years| *years > 0) {
            let possible = f32::from(weights.experience);
            let years = candidate.experience_years;
            components.push(ScoreComponent {
                criterion: MatchCriterion::Experience,
                earned: proportional(years as f32, min_years as f32, possible),
                possible,
                notes: format!("{years} year(s) experience against minimum {min_years}"),
            });
        }
    }

    if weights.skills > 0 && !requirements.skills.is_empty() {
        let possible = f32::from(weights.skills);
        let matched = requirements
            .skills
            .iter()
            .filter(|skill| candidate.skills.contains(skill.as_str()))
            .count();
        let required = requirements.skills.len();
        components.push(ScoreComponent {
            criterion: MatchCriterion::Skills,
            earned: possible * matched as f32 / required as f32,
            possible,
            notes: format!("{matched} of {required} required skill(s) present"),
        });
    }

    if weights.subjects > 0 && !requirements.subject_grades.is_empty() {
        let possible = f32::from(weights.subjects);
        let shortfall = requirements
            .subject_grades
            .iter()
            .find(|(subject, minimum)| {
                candidate
                    .subject_grades
                    .get(subject.as_str())
                    .map(|grade| grade.points() < minimum.points())
                    .unwrap_or(true)
            })
            .map(|(subject, minimum)| format!("{subject} below {minimum} or missing"));
        components.push(ScoreComponent {
            criterion: MatchCriterion::Subjects,
            earned: if shortfall.is_none() { possible } else { 0.0 },
            possible,
            notes: shortfall.unwrap_or_else(|| "all subject grade minimums met".to_string()),
        });
    }

    let earned: f32 = components.iter().map(|component| component.earned).sum();
    let denominator = match weights.normalization {
        Normalization::Fixed => f32::from(weights.total()),
        Normalization::Renormalized => components.iter().map(|component| component.possible).sum(),
    };

    let score = if denominator > 0.0 {
        let raw = (earned / denominator * 100.0).round();
        if raw.is_finite() {
            raw.clamp(0.0, 100.0) as u8
        } else {
            0
        }
    } else {
        0
    };

    (components, score)
}
