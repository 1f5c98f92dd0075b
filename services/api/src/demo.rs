use crate::infra::{InMemoryNotifier, InMemoryPlacementStore};
use career_match::error::AppError;
use career_match::workflows::placement::{
    Application, ApplicationId, ApplicationOutcome, ApplicationQuery, ApplicationStatus,
    CandidateId,
    CandidateProfile, DecisionDomain, EducationLevel, LetterGrade, MatchingConfig, OfferTarget,
    Opening, PlacementService, PlacementServiceError, RequirementSet, ResolutionPrompt,
};
use clap::Args;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type DemoService = PlacementService<
    InMemoryPlacementStore,
    InMemoryPlacementStore,
    InMemoryPlacementStore,
    InMemoryNotifier,
>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the course admission selection walkthrough.
    #[arg(long)]
    pub(crate) skip_admissions: bool,
    /// Skip the job offer decline and waitlist walkthrough.
    #[arg(long)]
    pub(crate) skip_waitlist: bool,
    /// Pending course applications allowed per institution.
    #[arg(long)]
    pub(crate) max_pending_per_institution: Option<usize>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = MatchingConfig::default();
    if let Some(limit) = args.max_pending_per_institution.filter(|limit| *limit > 0) {
        config.max_pending_per_institution = limit;
    }

    let store = Arc::new(InMemoryPlacementStore::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    let service = PlacementService::new(
        store.clone(),
        store.clone(),
        store,
        notifier.clone(),
        config,
    );

    println!("Career match demo");
    seed_catalog(&service)?;

    if !args.skip_admissions {
        admissions_walkthrough(&service)?;
    }
    if !args.skip_waitlist {
        waitlist_walkthrough(&service)?;
    }

    let sent = notifier.sent();
    if sent.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications");
        for notification in sent {
            let reason = notification
                .details
                .get("reason")
                .map(String::as_str)
                .unwrap_or("unspecified");
            println!(
                "- template={} -> {} ({}, {})",
                notification.template, notification.recipient, notification.application_id, reason
            );
        }
    }

    Ok(())
}

fn profile(
    id: &str,
    gpa: f32,
    experience_years: u32,
    skills: &[&str],
    grades: &[(&str, LetterGrade)],
) -> CandidateProfile {
    CandidateProfile {
        gpa: Some(gpa),
        experience_years,
        skills: skills.iter().map(|skill| skill.to_string()).collect::<BTreeSet<_>>(),
        education_level: Some(EducationLevel::Bachelors),
        subject_grades: grades
            .iter()
            .map(|(subject, grade)| (subject.to_string(), *grade))
            .collect(),
        field_of_study: Some("Computer Science".to_string()),
        ..CandidateProfile::new(CandidateId(id.to_string()))
    }
}

fn course_opening(institution_id: &str, course_id: &str, title: &str) -> Opening {
    Opening {
        target: OfferTarget::course(institution_id, course_id),
        title: title.to_string(),
        requirements: RequirementSet {
            min_gpa: Some(3.0),
            field: Some("science".to_string()),
            subject_grades: BTreeMap::from([("Mathematics".to_string(), LetterGrade::B)]),
            ..RequirementSet::default()
        },
    }
}

fn analyst_opening() -> Opening {
    Opening {
        target: OfferTarget::job("northwind", "data-analyst"),
        title: "Graduate Data Analyst".to_string(),
        requirements: RequirementSet {
            min_gpa: Some(2.5),
            min_experience_years: Some(2),
            field: Some("computer science".to_string()),
            skills: vec!["SQL".to_string(), "Python".to_string(), "Tableau".to_string()],
            ..RequirementSet::default()
        },
    }
}

fn seed_catalog(service: &DemoService) -> Result<(), PlacementServiceError> {
    service.publish_opening(course_opening(
        "uni-north",
        "msc-ai",
        "MSc Artificial Intelligence",
    ))?;
    service.publish_opening(course_opening(
        "uni-south",
        "msc-ds",
        "MSc Data Science",
    ))?;
    service.publish_opening(analyst_opening())?;

    service.save_profile(profile(
        "ada",
        3.9,
        2,
        &["SQL", "Python", "Tableau"],
        &[("Mathematics", LetterGrade::AStar)],
    ))?;
    service.save_profile(profile("ben", 3.1, 1, &["SQL", "Python"], &[]))?;
    service.save_profile(profile("cy", 2.7, 0, &["SQL"], &[]))?;
    Ok(())
}

fn submit(
    service: &DemoService,
    candidate: &str,
    target: &OfferTarget,
) -> Result<Option<Application>, PlacementServiceError> {
    let candidate_id = CandidateId(candidate.to_string());
    match service.apply(&candidate_id, target)? {
        ApplicationOutcome::Submitted(application) => {
            println!(
                "- {} applied to {} -> {} (match {})",
                candidate, target, application.id, application.match_score
            );
            Ok(Some(application))
        }
        ApplicationOutcome::Ineligible(report) => {
            println!("- {} is not eligible for {}", candidate, target);
            for reason in report.reasons() {
                println!("    - {}", reason);
            }
            Ok(None)
        }
    }
}

fn describe_prompt(prompt: &ResolutionPrompt) -> String {
    match prompt {
        ResolutionPrompt::None => "no decision pending".to_string(),
        ResolutionPrompt::ChooseAdmission { applications } => {
            format!("choose one admission among {}", join_ids(applications))
        }
        ResolutionPrompt::RespondToOffer { applications } => {
            format!("respond to offer(s) {}", join_ids(applications))
        }
    }
}

fn join_ids(ids: &[ApplicationId]) -> String {
    ids.iter()
        .map(|id| id.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn admissions_walkthrough(service: &DemoService) -> Result<(), AppError> {
    println!("\nCourse admissions");
    let ada = CandidateId("ada".to_string());

    let preview = service.preview(&ada, &OfferTarget::course("uni-north", "msc-ai"))?;
    println!(
        "- preview for ada on MSc AI: eligible={} score={}",
        preview.eligibility.eligible, preview.breakdown.score
    );
    for component in &preview.breakdown.components {
        println!(
            "    - {:?}: {:.1}/{:.0} ({})",
            component.criterion, component.earned, component.possible, component.notes
        );
    }
    for advisory in &preview.breakdown.advisories {
        println!("    - note: {}", advisory);
    }

    let mut admitted = Vec::new();
    for target in [
        OfferTarget::course("uni-north", "msc-ai"),
        OfferTarget::course("uni-south", "msc-ds"),
    ] {
        if let Some(application) = submit(service, "ada", &target)? {
            let change = service.update_status(&application.id, ApplicationStatus::Admitted)?;
            println!(
                "  {} admitted ada: {}",
                target.owner_id(),
                describe_prompt(&change.prompt)
            );
            admitted.push(application.id);
        }
    }

    let Some(chosen) = admitted.first() else {
        println!("- no admissions to resolve");
        return Ok(());
    };

    match service.select_offer(&ada, DecisionDomain::CourseAdmission, chosen) {
        Ok(report) => println!("- ada confirmed {}: {}", chosen, report),
        Err(PlacementServiceError::Resolver(err)) => {
            println!("- selection incomplete: {}", err)
        }
        Err(err) => return Err(err.into()),
    }

    let remaining = service.applications_for(&ada)?;
    println!("- ada now holds {} course record(s)", remaining.len());
    for application in remaining {
        println!(
            "    - {} {} ({})",
            application.id, application.target, application.status
        );
    }
    Ok(())
}

fn waitlist_walkthrough(service: &DemoService) -> Result<(), AppError> {
    println!("\nJob offer waitlist");
    let job = analyst_opening().target;

    let mut offer = None;
    for candidate in ["ada", "ben", "cy"] {
        if let Some(application) = submit(service, candidate, &job)? {
            if candidate == "ada" {
                offer = Some(application.id);
            }
        }
    }

    let Some(offer) = offer else {
        println!("- no application to offer");
        return Ok(());
    };

    let change = service.update_status(&offer, ApplicationStatus::Offered)?;
    println!("- northwind offered ada: {}", describe_prompt(&change.prompt));

    let ada = CandidateId("ada".to_string());
    match service.decline_offer(&ada, &offer) {
        Ok(outcome) => {
            println!("- ada declined {}", outcome.declined);
            match outcome.promoted {
                Some(promoted) => println!(
                    "- offer extended to {} ({}, match {})",
                    promoted.candidate_id, promoted.id, promoted.match_score
                ),
                None => println!("- no pending applicants to promote"),
            }
        }
        Err(PlacementServiceError::Resolver(err)) => println!("- decline incomplete: {}", err),
        Err(err) => return Err(err.into()),
    }

    let pipeline = service
        .watch(ApplicationQuery::all().at_company(job.owner_id()))?
        .current();
    println!("- {} pipeline", job.owner_id());
    for application in pipeline {
        println!(
            "    - {} {} -> {} (match {})",
            application.candidate_id, application.id, application.status, application.match_score
        );
    }
    Ok(())
}
