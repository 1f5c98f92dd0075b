use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Bookmark, CandidateId, CandidateProfile,
    DecisionDomain, OfferTarget, Opening,
};
use super::feed::ApplicationFeed;
use super::matching::{EligibilityReport, MatchBreakdown, MatchEngine, MatchingConfig};
use super::repository::{
    ApplicationQuery, ApplicationRepository, BatchOperation, BookmarkRepository,
    CatalogRepository, NotificationPublisher, RepositoryError,
};
use super::resolver::{
    dispatch_offer, resolution_prompt, CascadeReport, DeclineOutcome, NotificationStatus,
    OfferResolver, ResolutionPrompt, ResolverError,
};
use super::validation::{sanitize_opening, sanitize_profile, validate_target, ValidationError};

/// Service composing the catalog, application store, matcher, and offer resolver.
pub struct PlacementService<R, C, B, N> {
    applications: Arc<R>,
    catalog: Arc<C>,
    bookmarks: Arc<B>,
    notifier: Arc<N>,
    engine: Arc<MatchEngine>,
    resolver: OfferResolver<R, N>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Eligibility and score for a candidate/opening pair without applying.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPreview {
    pub target: OfferTarget,
    pub eligibility: EligibilityReport,
    pub breakdown: MatchBreakdown,
}

/// Result of an application attempt. Ineligibility is reported, not raised.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationOutcome {
    Submitted(Application),
    Ineligible(EligibilityReport),
}

/// Status write by an institution or company, with any decision the candidate now faces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub application: Application,
    pub prompt: ResolutionPrompt,
    pub notification: NotificationStatus,
}

impl<R, C, B, N> PlacementService<R, C, B, N>
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        applications: Arc<R>,
        catalog: Arc<C>,
        bookmarks: Arc<B>,
        notifier: Arc<N>,
        config: MatchingConfig,
    ) -> Self {
        let resolver = OfferResolver::new(applications.clone(), notifier.clone());
        Self {
            applications,
            catalog,
            bookmarks,
            notifier,
            engine: Arc::new(MatchEngine::new(config)),
            resolver,
        }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn save_profile(
        &self,
        profile: CandidateProfile,
    ) -> Result<CandidateProfile, PlacementServiceError> {
        let profile = sanitize_profile(profile)?;
        self.catalog.save_profile(profile.clone())?;
        debug!(candidate_id = %profile.candidate_id, "profile saved");
        Ok(profile)
    }

    pub fn publish_opening(&self, opening: Opening) -> Result<Opening, PlacementServiceError> {
        let opening = sanitize_opening(opening)?;
        self.catalog.save_opening(opening.clone())?;
        info!(offer = %opening.target, title = %opening.title, "opening published");
        Ok(opening)
    }

    pub fn openings(&self) -> Result<Vec<Opening>, PlacementServiceError> {
        Ok(self.catalog.openings()?)
    }

    fn load_profile(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<CandidateProfile, PlacementServiceError> {
        self.catalog
            .profile(candidate_id)?
            .ok_or_else(|| PlacementServiceError::ProfileNotFound(candidate_id.clone()))
    }

    fn load_opening(&self, target: &OfferTarget) -> Result<Opening, PlacementServiceError> {
        self.catalog
            .opening(target)?
            .ok_or_else(|| PlacementServiceError::OpeningNotFound(target.clone()))
    }

    pub fn preview(
        &self,
        candidate_id: &CandidateId,
        target: &OfferTarget,
    ) -> Result<MatchPreview, PlacementServiceError> {
        validate_target(target)?;
        let profile = self.load_profile(candidate_id)?;
        let opening = self.load_opening(target)?;

        Ok(MatchPreview {
            target: opening.target.clone(),
            eligibility: self.engine.eligibility(&profile, &opening),
            breakdown: self.engine.breakdown(&profile, &opening),
        })
    }

    /// Submit a new application after the eligibility gate, persisting its match score.
    pub fn apply(
        &self,
        candidate_id: &CandidateId,
        target: &OfferTarget,
    ) -> Result<ApplicationOutcome, PlacementServiceError> {
        validate_target(target)?;
        let profile = self.load_profile(candidate_id)?;
        let opening = self.load_opening(target)?;

        let duplicates = self.applications.query(
            &ApplicationQuery::for_candidate(candidate_id).with_target(target),
        )?;
        if !duplicates.is_empty() {
            return Err(PlacementServiceError::DuplicateApplication(target.clone()));
        }

        if let Some(institution_id) = target.institution_id() {
            let limit = self.engine.config().max_pending_per_institution;
            let pending = self
                .applications
                .query(
                    &ApplicationQuery::for_candidate(candidate_id)
                        .at_institution(institution_id)
                        .with_status(ApplicationStatus::Pending)
                        .with_status(ApplicationStatus::Review),
                )?
                .len();
            if pending >= limit {
                return Err(PlacementServiceError::PendingLimit {
                    institution_id: institution_id.to_string(),
                    limit,
                });
            }
        }

        let eligibility = self.engine.eligibility(&profile, &opening);
        if !eligibility.eligible {
            info!(
                candidate_id = %candidate_id,
                offer = %target,
                failures = eligibility.failures.len(),
                "application blocked by eligibility"
            );
            return Ok(ApplicationOutcome::Ineligible(eligibility));
        }

        let application = Application {
            id: next_application_id(),
            candidate_id: candidate_id.clone(),
            target: target.clone(),
            status: ApplicationStatus::Pending,
            match_score: self.engine.score(&profile, &opening),
            applied_at: Utc::now(),
            decision_made: false,
            final_choice: false,
        };

        let stored = self.applications.insert(application)?;
        info!(
            application_id = %stored.id,
            candidate_id = %candidate_id,
            offer = %target,
            match_score = stored.match_score,
            "application submitted"
        );
        Ok(ApplicationOutcome::Submitted(stored))
    }

    pub fn application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, PlacementServiceError> {
        self.applications
            .fetch(application_id)?
            .ok_or_else(|| PlacementServiceError::ApplicationNotFound(application_id.clone()))
    }

    /// Candidate's applications with match scores recomputed from the current profile.
    pub fn applications_for(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<Application>, PlacementServiceError> {
        let mut applications = self
            .applications
            .query(&ApplicationQuery::for_candidate(candidate_id))?;

        let Some(profile) = self.catalog.profile(candidate_id)? else {
            return Ok(applications);
        };

        let mut refreshed = Vec::new();
        for application in &mut applications {
            let Some(opening) = self.catalog.opening(&application.target)? else {
                continue;
            };
            let score = self.engine.score(&profile, &opening);
            if score != application.match_score {
                application.match_score = score;
                refreshed.push(BatchOperation::Rescore {
                    id: application.id.clone(),
                    match_score: score,
                });
            }
        }

        if !refreshed.is_empty() {
            let count = refreshed.len();
            match self.applications.apply_batch(refreshed) {
                Ok(()) => debug!(candidate_id = %candidate_id, count, "match scores refreshed"),
                Err(err) => warn!(
                    candidate_id = %candidate_id,
                    error = %err,
                    "failed to persist refreshed match scores"
                ),
            }
        }

        Ok(applications)
    }

    /// Authority status change (institution or company).
    pub fn update_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<StatusChange, PlacementServiceError> {
        let mut application = self.application(application_id)?;
        let domain = application.domain();

        if !application.status.can_transition_to(status, domain) {
            return Err(PlacementServiceError::InvalidTransition {
                from: application.status,
                to: status,
            });
        }

        application.status = status;
        self.applications.update(application.clone())?;
        info!(
            application_id = %application.id,
            status = status.label(),
            "application status updated"
        );

        let notification = if status == ApplicationStatus::Offered {
            dispatch_offer(self.notifier.as_ref(), &application, "authority_offer")
        } else {
            NotificationStatus::NotRequired
        };

        let group = self
            .resolver
            .decision_group(&application.candidate_id, domain)?;
        let prompt = resolution_prompt(&group, domain);

        Ok(StatusChange {
            application,
            prompt,
            notification,
        })
    }

    /// Candidate removes an application that has not been decided yet.
    pub fn withdraw(
        &self,
        candidate_id: &CandidateId,
        application_id: &ApplicationId,
    ) -> Result<(), PlacementServiceError> {
        let application = self.application(application_id)?;
        if &application.candidate_id != candidate_id {
            return Err(PlacementServiceError::Forbidden(application_id.clone()));
        }
        if !application.status.is_awaiting_decision() {
            return Err(PlacementServiceError::InvalidTransition {
                from: application.status,
                to: ApplicationStatus::Declined,
            });
        }
        self.applications.delete(application_id)?;
        info!(application_id = %application_id, "application withdrawn");
        Ok(())
    }

    pub fn prompt(
        &self,
        candidate_id: &CandidateId,
        domain: DecisionDomain,
    ) -> Result<ResolutionPrompt, PlacementServiceError> {
        Ok(self.resolver.prompt(candidate_id, domain)?)
    }

    pub fn select_offer(
        &self,
        candidate_id: &CandidateId,
        domain: DecisionDomain,
        application_id: &ApplicationId,
    ) -> Result<CascadeReport, PlacementServiceError> {
        Ok(self.resolver.select(candidate_id, domain, application_id)?)
    }

    pub fn decline_offer(
        &self,
        candidate_id: &CandidateId,
        application_id: &ApplicationId,
    ) -> Result<DeclineOutcome, PlacementServiceError> {
        Ok(self.resolver.decline(candidate_id, application_id)?)
    }

    pub fn bookmark(
        &self,
        candidate_id: &CandidateId,
        target: &OfferTarget,
    ) -> Result<Bookmark, PlacementServiceError> {
        let OfferTarget::Job { company_id, job_id } = target else {
            return Err(PlacementServiceError::NotBookmarkable(target.clone()));
        };
        validate_target(target)?;
        self.load_opening(target)?;

        let bookmark = Bookmark {
            candidate_id: candidate_id.clone(),
            company_id: company_id.clone(),
            job_id: job_id.clone(),
            created_at: Utc::now(),
        };
        Ok(self.bookmarks.add_bookmark(bookmark)?)
    }

    pub fn remove_bookmark(
        &self,
        candidate_id: &CandidateId,
        company_id: &str,
        job_id: &str,
    ) -> Result<(), PlacementServiceError> {
        Ok(self
            .bookmarks
            .remove_bookmark(candidate_id, company_id, job_id)?)
    }

    pub fn bookmarks(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<Bookmark>, PlacementServiceError> {
        Ok(self.bookmarks.bookmarks(candidate_id)?)
    }

    pub fn watch(&self, query: ApplicationQuery) -> Result<ApplicationFeed, PlacementServiceError> {
        Ok(self.applications.subscribe(query)?)
    }
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error("no profile for candidate {0}")]
    ProfileNotFound(CandidateId),
    #[error("no opening published for {0}")]
    OpeningNotFound(OfferTarget),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("already applied to {0}")]
    DuplicateApplication(OfferTarget),
    #[error("at most {limit} pending application(s) allowed per institution ({institution_id})")]
    PendingLimit { institution_id: String, limit: usize },
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application {0} belongs to another candidate")]
    Forbidden(ApplicationId),
    #[error("{0} cannot be bookmarked")]
    NotBookmarkable(OfferTarget),
}
