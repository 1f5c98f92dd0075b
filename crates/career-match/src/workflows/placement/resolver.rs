//! Multi-offer resolution.
//!
//! Planning is pure and works on a sibling snapshot; [`OfferResolver`] runs the plan
//! against the store as a sequence of best-effort writes and reports exactly which
//! records were touched when a write fails midway.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{Application, ApplicationId, ApplicationStatus, CandidateId, DecisionDomain};
use super::repository::{
    ApplicationQuery, ApplicationRepository, Notification, NotificationPublisher, RepositoryError,
};

/// What the candidate has to decide for a decision group, if anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "prompt", rename_all = "snake_case")]
pub enum ResolutionPrompt {
    None,
    ChooseAdmission { applications: Vec<ApplicationId> },
    RespondToOffer { applications: Vec<ApplicationId> },
}

pub fn resolution_prompt(group: &[Application], domain: DecisionDomain) -> ResolutionPrompt {
    let offers: Vec<ApplicationId> = group
        .iter()
        .filter(|application| {
            application.domain() == domain && application.status == domain.offer_status()
        })
        .map(|application| application.id.clone())
        .collect();

    match domain {
        DecisionDomain::CourseAdmission if offers.len() >= 2 => {
            ResolutionPrompt::ChooseAdmission {
                applications: offers,
            }
        }
        DecisionDomain::JobOffer if !offers.is_empty() => ResolutionPrompt::RespondToOffer {
            applications: offers,
        },
        _ => ResolutionPrompt::None,
    }
}

/// Rejections raised while planning against a sibling snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("application {0} is not part of this decision group")]
    NotInGroup(ApplicationId),
    #[error("application {id} is {status}, expected {expected}")]
    NotOffered {
        id: ApplicationId,
        status: ApplicationStatus,
        expected: ApplicationStatus,
    },
    #[error("a final choice ({0}) has already been made in this decision group")]
    AlreadyDecided(ApplicationId),
    #[error("application {0} belongs to another candidate")]
    WrongCandidate(ApplicationId),
}

/// Writes needed to keep one offer and drop its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    pub finalize: Application,
    pub discard: Vec<ApplicationId>,
}

pub fn plan_selection(
    group: &[Application],
    domain: DecisionDomain,
    selected: &ApplicationId,
) -> Result<SelectionPlan, ResolutionError> {
    let chosen = group
        .iter()
        .find(|application| &application.id == selected && application.domain() == domain)
        .ok_or_else(|| ResolutionError::NotInGroup(selected.clone()))?;

    if let Some(decided) = group
        .iter()
        .find(|application| application.id != chosen.id && application.status.is_final_choice())
    {
        return Err(ResolutionError::AlreadyDecided(decided.id.clone()));
    }

    let expected = domain.offer_status();
    if chosen.status != expected {
        return Err(ResolutionError::NotOffered {
            id: chosen.id.clone(),
            status: chosen.status,
            expected,
        });
    }

    let finalize = Application {
        status: domain.final_status(),
        decision_made: true,
        final_choice: true,
        ..chosen.clone()
    };
    let discard = group
        .iter()
        .filter(|application| application.id != chosen.id)
        .map(|application| application.id.clone())
        .collect();

    Ok(SelectionPlan { finalize, discard })
}

/// Next nominee among pending applicants: highest score, then earliest applied, then id.
pub fn rank_waitlist(pending: &[Application]) -> Option<&Application> {
    pending
        .iter()
        .filter(|application| application.status == ApplicationStatus::Pending)
        .min_by(|left, right| {
            right
                .match_score
                .cmp(&left.match_score)
                .then_with(|| left.applied_at.cmp(&right.applied_at))
                .then_with(|| left.id.cmp(&right.id))
        })
}

/// Tell the candidate about a new offer. The offer write has already landed, so a
/// transport failure is reported rather than raised.
pub(crate) fn dispatch_offer<N>(
    notifier: &N,
    application: &Application,
    reason: &str,
) -> NotificationStatus
where
    N: NotificationPublisher + ?Sized,
{
    match notifier.publish(offer_notification(application, reason)) {
        Ok(()) => NotificationStatus::Sent,
        Err(err) => {
            warn!(application_id = %application.id, error = %err, "offer notification failed");
            NotificationStatus::Failed(err.to_string())
        }
    }
}

fn offer_notification(application: &Application, reason: &str) -> Notification {
    let mut details = BTreeMap::new();
    details.insert("reason".to_string(), reason.to_string());
    details.insert("target".to_string(), application.target.to_string());
    details.insert(
        "match_score".to_string(),
        application.match_score.to_string(),
    );
    Notification {
        template: "offer_extended".to_string(),
        recipient: application.candidate_id.clone(),
        application_id: application.id.clone(),
        details,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    Delete,
    WaitlistLookup,
    Promote,
}

/// A cascade write that did not land. Lookups that fail before any record is
/// chosen carry no application id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    pub step: CascadeStep,
    pub reason: String,
}

/// Record of every write a cascade issued and whether it landed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub finalized: Option<ApplicationId>,
    pub deleted: Vec<ApplicationId>,
    pub failed: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn applied(&self) -> Vec<&ApplicationId> {
        self.finalized
            .iter()
            .chain(self.deleted.iter())
            .collect()
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let applied: Vec<&str> = self.applied().into_iter().map(|id| id.0.as_str()).collect();
        let failed: Vec<String> = self
            .failed
            .iter()
            .map(|failure| match &failure.application_id {
                Some(id) => format!("{} ({:?}: {})", id, failure.step, failure.reason),
                None => format!("{:?}: {}", failure.step, failure.reason),
            })
            .collect();
        write!(
            f,
            "updated [{}]; not updated [{}]",
            applied.join(", "),
            failed.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NotificationStatus {
    NotRequired,
    Sent,
    Failed(String),
}

/// Result of declining an offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclineOutcome {
    pub declined: ApplicationId,
    pub promoted: Option<Application>,
    pub notification: NotificationStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    Plan(#[from] ResolutionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("cascade left records inconsistent: {0}")]
    PartialCascade(CascadeReport),
}

/// Saga runner enforcing at most one final choice per decision group.
pub struct OfferResolver<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
}

impl<R, N> OfferResolver<R, N>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Current sibling group for a candidate in one domain.
    pub fn decision_group(
        &self,
        candidate_id: &CandidateId,
        domain: DecisionDomain,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.repository
            .query(&ApplicationQuery::for_candidate(candidate_id).in_domain(domain))
    }

    pub fn prompt(
        &self,
        candidate_id: &CandidateId,
        domain: DecisionDomain,
    ) -> Result<ResolutionPrompt, RepositoryError> {
        let group = self.decision_group(candidate_id, domain)?;
        Ok(resolution_prompt(&group, domain))
    }

    /// Keep `selected` and delete every sibling in its decision group.
    pub fn select(
        &self,
        candidate_id: &CandidateId,
        domain: DecisionDomain,
        selected: &ApplicationId,
    ) -> Result<CascadeReport, ResolverError> {
        let group = self.decision_group(candidate_id, domain)?;
        let plan = plan_selection(&group, domain, selected)?;

        self.repository.update(plan.finalize.clone())?;

        let mut report = CascadeReport {
            finalized: Some(plan.finalize.id.clone()),
            ..CascadeReport::default()
        };

        for id in plan.discard {
            match self.repository.delete(&id) {
                Ok(()) => report.deleted.push(id),
                Err(RepositoryError::NotFound) => {
                    debug!(application_id = %id, "sibling already removed");
                    report.deleted.push(id);
                }
                Err(err) => report.failed.push(CascadeFailure {
                    application_id: Some(id),
                    step: CascadeStep::Delete,
                    reason: err.to_string(),
                }),
            }
        }

        if report.is_complete() {
            info!(
                candidate_id = %candidate_id,
                domain = domain.label(),
                application_id = %selected,
                deleted = report.deleted.len(),
                "offer selected"
            );
            Ok(report)
        } else {
            warn!(
                candidate_id = %candidate_id,
                domain = domain.label(),
                failed = report.failed.len(),
                "offer selection cascade incomplete"
            );
            Err(ResolverError::PartialCascade(report))
        }
    }

    /// Drop a declined offer; for jobs, extend the offer to the best pending applicant.
    pub fn decline(
        &self,
        candidate_id: &CandidateId,
        application_id: &ApplicationId,
    ) -> Result<DeclineOutcome, ResolverError> {
        let declined = self
            .repository
            .fetch(application_id)?
            .ok_or_else(|| ResolverError::NotFound(application_id.clone()))?;

        if &declined.candidate_id != candidate_id {
            return Err(ResolutionError::WrongCandidate(declined.id).into());
        }

        let domain = declined.domain();
        let expected = domain.offer_status();
        if declined.status != expected {
            return Err(ResolutionError::NotOffered {
                id: declined.id,
                status: declined.status,
                expected,
            }
            .into());
        }

        self.repository.delete(&declined.id)?;
        info!(
            candidate_id = %candidate_id,
            application_id = %declined.id,
            "offer declined"
        );

        if domain != DecisionDomain::JobOffer {
            return Ok(DeclineOutcome {
                declined: declined.id,
                promoted: None,
                notification: NotificationStatus::NotRequired,
            });
        }

        let waitlist_query =
            ApplicationQuery::for_target(&declined.target).with_status(ApplicationStatus::Pending);
        let waitlist = match self.repository.query(&waitlist_query) {
            Ok(waitlist) => waitlist,
            Err(err) => {
                return Err(ResolverError::PartialCascade(CascadeReport {
                    deleted: vec![declined.id.clone()],
                    failed: vec![CascadeFailure {
                        application_id: None,
                        step: CascadeStep::WaitlistLookup,
                        reason: err.to_string(),
                    }],
                    ..CascadeReport::default()
                }));
            }
        };

        let Some(nominee) = rank_waitlist(&waitlist) else {
            return Ok(DeclineOutcome {
                declined: declined.id,
                promoted: None,
                notification: NotificationStatus::NotRequired,
            });
        };

        let promoted = Application {
            status: ApplicationStatus::Offered,
            ..nominee.clone()
        };
        if let Err(err) = self.repository.update(promoted.clone()) {
            return Err(ResolverError::PartialCascade(CascadeReport {
                deleted: vec![declined.id],
                failed: vec![CascadeFailure {
                    application_id: Some(promoted.id),
                    step: CascadeStep::Promote,
                    reason: err.to_string(),
                }],
                ..CascadeReport::default()
            }));
        }

        info!(
            application_id = %promoted.id,
            candidate_id = %promoted.candidate_id,
            match_score = promoted.match_score,
            "waitlisted applicant promoted to offer"
        );

        let notification =
            dispatch_offer(self.notifier.as_ref(), &promoted, "waitlist_promotion");

        Ok(DeclineOutcome {
            declined: declined.id,
            promoted: Some(promoted),
            notification,
        })
    }
}
