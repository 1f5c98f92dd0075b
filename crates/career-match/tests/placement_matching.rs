//! Properties of the pure matching and resolution API, exercised through the public
//! `career_match::workflows::placement` facade.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{TimeZone, Utc};

use career_match::workflows::placement::{
    check_eligibility, is_eligible, plan_selection, rank_waitlist, resolution_prompt, score,
    Application, ApplicationId, ApplicationStatus, CandidateId, CandidateProfile,
    DecisionDomain, LetterGrade, MatchPath, OfferTarget, RequirementSet, ResolutionError,
    ResolutionPrompt, COURSE_WEIGHTS, JOB_WEIGHTS,
};

fn profile(gpa: Option<f32>) -> CandidateProfile {
    CandidateProfile {
        gpa,
        experience_years: 2,
        skills: BTreeSet::from(["SQL".to_string(), "Python".to_string()]),
        field_of_study: Some("Computer Science".to_string()),
        subject_grades: BTreeMap::from([("Mathematics".to_string(), LetterGrade::B)]),
        ..CandidateProfile::new(CandidateId("cand-1".to_string()))
    }
}

fn requirements() -> RequirementSet {
    RequirementSet {
        min_gpa: Some(3.0),
        min_experience_years: Some(3),
        field: Some("computer science".to_string()),
        skills: vec!["SQL".to_string(), "Go".to_string()],
        subject_grades: BTreeMap::from([("Mathematics".to_string(), LetterGrade::C)]),
        ..RequirementSet::default()
    }
}

fn application(id: &str, status: ApplicationStatus, score: u8, day: u32) -> Application {
    Application {
        id: ApplicationId(id.to_string()),
        candidate_id: CandidateId("cand-1".to_string()),
        target: OfferTarget::course("inst-1", id),
        status,
        match_score: score,
        applied_at: Utc
            .with_ymd_and_hms(2025, 9, day, 10, 0, 0)
            .single()
            .expect("valid timestamp"),
        decision_made: false,
        final_choice: false,
    }
}

#[test]
fn eligibility_is_monotonic_in_gpa() {
    let requirements = requirements();
    for path in [MatchPath::Course, MatchPath::Job] {
        let mut was_eligible = false;
        for step in 0..=40 {
            let gpa = step as f32 / 10.0;
            let eligible = is_eligible(&profile(Some(gpa)), &requirements, path);
            assert!(
                eligible || !was_eligible,
                "raising gpa to {gpa} revoked eligibility on {path:?}"
            );
            was_eligible = eligible;
        }
        assert!(was_eligible, "a 4.0 candidate should qualify on {path:?}");
    }
}

#[test]
fn scores_never_leave_percentage_range() {
    let requirements = requirements();
    for weights in [JOB_WEIGHTS, COURSE_WEIGHTS] {
        for gpa in [None, Some(0.0), Some(1.2), Some(3.0), Some(4.0)] {
            let value = score(&profile(gpa), &requirements, &weights);
            assert!(value <= 100);
        }
    }
}

#[test]
fn job_path_partial_match_uses_fixed_denominator() {
    // field 60 + gpa 20 + experience 10 * 2/3 + skills 10 * 1/2
    let value = score(&profile(Some(3.4)), &requirements(), &JOB_WEIGHTS);
    assert_eq!(value, 92);
}

#[test]
fn missing_gpa_reports_zero() {
    let report = check_eligibility(&profile(None), &requirements(), MatchPath::Course);
    assert!(!report.eligible);
    assert_eq!(report.reasons(), vec!["gpa 0.00 is below the required 3.00"]);
}

#[test]
fn selection_leaves_a_single_final_choice() {
    let group = vec![
        application("a", ApplicationStatus::Admitted, 70, 1),
        application("b", ApplicationStatus::Admitted, 90, 2),
        application("c", ApplicationStatus::Review, 50, 3),
    ];
    assert!(matches!(
        resolution_prompt(&group, DecisionDomain::CourseAdmission),
        ResolutionPrompt::ChooseAdmission { .. }
    ));

    let plan = plan_selection(
        &group,
        DecisionDomain::CourseAdmission,
        &ApplicationId("b".to_string()),
    )
    .expect("plan builds");

    assert_eq!(plan.finalize.status, ApplicationStatus::Confirmed);
    assert!(plan.finalize.final_choice);
    assert_eq!(
        plan.discard,
        vec![ApplicationId("a".to_string()), ApplicationId("c".to_string())]
    );

    let not_admitted = plan_selection(
        &group,
        DecisionDomain::CourseAdmission,
        &ApplicationId("c".to_string()),
    );
    assert!(matches!(
        not_admitted,
        Err(ResolutionError::NotOffered {
            status: ApplicationStatus::Review,
            ..
        })
    ));
}

#[test]
fn waitlist_prefers_score_then_seniority() {
    let pending = vec![
        application("late-high", ApplicationStatus::Pending, 72, 5),
        application("early-low", ApplicationStatus::Pending, 55, 1),
        application("early-high", ApplicationStatus::Pending, 72, 2),
        application("offered", ApplicationStatus::Offered, 99, 1),
    ];

    let nominee = rank_waitlist(&pending).expect("someone is pending");
    assert_eq!(nominee.id.0, "early-high");

    assert!(rank_waitlist(&pending[3..]).is_none());
}
