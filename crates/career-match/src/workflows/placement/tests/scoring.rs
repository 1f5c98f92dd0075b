use std::collections::BTreeMap;

use super::common::*;
use crate::workflows::placement::domain::{
    CandidateProfile, EducationLevel, LetterGrade, MatchPath, OfferTarget, Opening,
    RequirementSet,
};
use crate::workflows::placement::matching::{
    IneligibilityReason, MatchCriterion, MatchEngine, MatchingConfig,
};

fn engine() -> MatchEngine {
    MatchEngine::new(MatchingConfig::default())
}

fn job_with(requirements: RequirementSet) -> Opening {
    Opening {
        target: OfferTarget::job("acme", "role"),
        title: "Role".to_string(),
        requirements,
    }
}

fn course_with(requirements: RequirementSet) -> Opening {
    Opening {
        target: OfferTarget::course("inst-1", "course"),
        title: "Course".to_string(),
        requirements,
    }
}

#[test]
fn strong_graduate_scores_ninety_on_analyst_job() {
    let engine = engine();
    let candidate = graduate("cand-1");
    let job = analyst_job();

    assert!(engine.eligibility(&candidate, &job).eligible);
    let breakdown = engine.breakdown(&candidate, &job);
    assert_eq!(breakdown.path, MatchPath::Job);
    assert_eq!(breakdown.score, 90);
    let criteria: Vec<MatchCriterion> = breakdown
        .components
        .iter()
        .map(|component| component.criterion)
        .collect();
    assert_eq!(
        criteria,
        vec![
            MatchCriterion::Field,
            MatchCriterion::Gpa,
            MatchCriterion::Skills
        ]
    );
}

#[test]
fn empty_requirements_score_zero_on_both_paths() {
    let engine = engine();
    let candidate = graduate("cand-1");

    assert_eq!(
        engine.score(&candidate, &job_with(RequirementSet::default())),
        0
    );
    assert_eq!(
        engine.score(&candidate, &course_with(RequirementSet::default())),
        0
    );
}

#[test]
fn course_score_renormalizes_over_applicable_criteria() {
    let engine = engine();
    let mut candidate = graduate("cand-1");
    candidate.gpa = Some(1.5);

    let gpa_only = course_with(RequirementSet {
        min_gpa: Some(3.0),
        ..RequirementSet::default()
    });
    assert_eq!(engine.score(&candidate, &gpa_only), 50);

    let with_subjects = course_with(RequirementSet {
        min_gpa: Some(3.0),
        field: Some("computer".to_string()),
        subject_grades: BTreeMap::from([("Chemistry".to_string(), LetterGrade::C)]),
        ..RequirementSet::default()
    });
    // field 30 + gpa 20 of 100; the missing subject earns nothing
    assert_eq!(engine.score(&candidate, &with_subjects), 50);
}

#[test]
fn job_score_keeps_full_weight_denominator() {
    let engine = engine();
    let candidate = graduate("cand-1");

    let skills_only = job_with(RequirementSet {
        skills: vec!["SQL".to_string(), "Rust".to_string()],
        ..RequirementSet::default()
    });
    assert_eq!(engine.score(&candidate, &skills_only), 5);

    let experience_only = job_with(RequirementSet {
        min_experience_years: Some(2),
        ..RequirementSet::default()
    });
    assert_eq!(engine.score(&candidate, &experience_only), 5);
}

#[test]
fn subject_grades_are_ignored_on_the_job_path() {
    let engine = engine();
    let candidate = CandidateProfile::new(candidate_id("cand-5"));
    let job = job_with(RequirementSet {
        subject_grades: BTreeMap::from([("Mathematics".to_string(), LetterGrade::AStar)]),
        ..RequirementSet::default()
    });

    assert_eq!(engine.score(&candidate, &job), 0);
    assert!(engine.eligibility(&candidate, &job).eligible);
}

#[test]
fn scores_stay_within_bounds() {
    let engine = engine();
    let mut candidate = graduate("cand-1");
    candidate.experience_years = 40;

    let demanding = job_with(RequirementSet {
        min_gpa: Some(0.1),
        min_experience_years: Some(1),
        field: Some("science".to_string()),
        skills: vec!["SQL".to_string()],
        ..RequirementSet::default()
    });
    assert_eq!(engine.score(&candidate, &demanding), 100);

    let mut nobody = CandidateProfile::new(candidate_id("cand-0"));
    nobody.gpa = Some(0.0);
    assert_eq!(engine.score(&nobody, &demanding), 0);
}

#[test]
fn unset_gpa_fails_minimum() {
    let engine = engine();
    let candidate = CandidateProfile::new(candidate_id("cand-4"));
    let course = course_with(RequirementSet {
        min_gpa: Some(3.0),
        ..RequirementSet::default()
    });

    let report = engine.eligibility(&candidate, &course);
    assert!(!report.eligible);
    assert_eq!(
        report.failures,
        vec![IneligibilityReason::GpaBelowMinimum {
            required: 3.0,
            actual: 0.0
        }]
    );
    assert_eq!(report.reasons(), vec!["gpa 0.00 is below the required 3.00"]);
}

#[test]
fn field_gate_applies_to_jobs_only() {
    let engine = engine();
    let mut candidate = graduate("cand-1");
    candidate.field_of_study = Some("Fine Art".to_string());
    let requirements = RequirementSet {
        field: Some("engineering".to_string()),
        ..RequirementSet::default()
    };

    assert!(!engine
        .eligibility(&candidate, &job_with(requirements.clone()))
        .eligible);
    assert!(
        engine
            .eligibility(&candidate, &course_with(requirements))
            .eligible
    );
}

#[test]
fn education_requirement_is_advisory_only() {
    let engine = engine();
    let requirements = RequirementSet {
        education_level: Some(EducationLevel::Masters),
        ..RequirementSet::default()
    };

    let bachelor = graduate("cand-1");
    let opening = job_with(requirements.clone());
    assert!(engine.eligibility(&bachelor, &opening).eligible);
    assert_eq!(
        engine.breakdown(&bachelor, &opening).advisories,
        vec!["education level bachelors is below the preferred masters".to_string()]
    );

    let mut doctor = graduate("cand-2");
    doctor.education_level = Some(EducationLevel::Phd);
    assert!(engine.breakdown(&doctor, &opening).advisories.is_empty());

    let mut unrecorded = graduate("cand-3");
    unrecorded.education_level = None;
    let course = course_with(requirements);
    assert!(engine.eligibility(&unrecorded, &course).eligible);
    assert_eq!(engine.breakdown(&unrecorded, &course).advisories.len(), 1);
}

#[test]
fn letter_grades_map_to_descending_points() {
    let points: Vec<u8> = LetterGrade::ALL.iter().map(|grade| grade.points()).collect();
    assert_eq!(points, vec![95, 85, 75, 65, 55, 45, 35]);
    assert!(LetterGrade::AStar > LetterGrade::A);
    assert!(LetterGrade::E > LetterGrade::F);
    assert_eq!("a*".parse::<LetterGrade>().expect("parses"), LetterGrade::AStar);
    assert!("G".parse::<LetterGrade>().is_err());
}
