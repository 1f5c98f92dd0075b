use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Bookmark, CandidateId, CandidateProfile,
    DecisionDomain, OfferTarget, Opening,
};
use super::feed::ApplicationFeed;

/// Predicate over the application collection. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationQuery {
    #[serde(default)]
    pub candidate_id: Option<CandidateId>,
    #[serde(default)]
    pub target: Option<OfferTarget>,
    #[serde(default)]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub domain: Option<DecisionDomain>,
    #[serde(default)]
    pub statuses: Vec<ApplicationStatus>,
}

impl ApplicationQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_candidate(candidate_id: &CandidateId) -> Self {
        Self {
            candidate_id: Some(candidate_id.clone()),
            ..Self::default()
        }
    }

    pub fn for_target(target: &OfferTarget) -> Self {
        Self {
            target: Some(target.clone()),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: &OfferTarget) -> Self {
        self.target = Some(target.clone());
        self
    }

    pub fn at_institution(mut self, institution_id: impl Into<String>) -> Self {
        self.institution_id = Some(institution_id.into());
        self
    }

    pub fn at_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn in_domain(mut self, domain: DecisionDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn matches(&self, application: &Application) -> bool {
        if let Some(candidate_id) = &self.candidate_id {
            if &application.candidate_id != candidate_id {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if &application.target != target {
                return false;
            }
        }
        if let Some(institution_id) = &self.institution_id {
            if application.target.institution_id() != Some(institution_id.as_str()) {
                return false;
            }
        }
        if let Some(company_id) = &self.company_id {
            let matches_company = matches!(
                &application.target,
                OfferTarget::Job { company_id: owner, .. } if owner == company_id
            );
            if !matches_company {
                return false;
            }
        }
        if let Some(domain) = self.domain {
            if application.domain() != domain {
                return false;
            }
        }
        self.statuses.is_empty() || self.statuses.contains(&application.status)
    }
}

/// One write inside a batched request.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Update(Application),
    /// Set only the match score, leaving every other field as currently stored.
    Rescore { id: ApplicationId, match_score: u8 },
    Delete(ApplicationId),
}

impl BatchOperation {
    pub fn application_id(&self) -> &ApplicationId {
        match self {
            BatchOperation::Update(application) => &application.id,
            BatchOperation::Rescore { id, .. } | BatchOperation::Delete(id) => id,
        }
    }
}

/// Storage abstraction for the application collection.
///
/// Writes are applied one at a time; implementations are not expected to provide
/// isolation between concurrent callers.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// Matching records ordered by `applied_at`, then id.
    fn query(&self, query: &ApplicationQuery) -> Result<Vec<Application>, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError>;
    fn apply_batch(&self, operations: Vec<BatchOperation>) -> Result<(), BatchError>;
    fn subscribe(&self, query: ApplicationQuery) -> Result<ApplicationFeed, RepositoryError>;
}

/// Profiles and published openings.
pub trait CatalogRepository: Send + Sync {
    fn profile(&self, candidate_id: &CandidateId)
        -> Result<Option<CandidateProfile>, RepositoryError>;
    fn save_profile(&self, profile: CandidateProfile) -> Result<(), RepositoryError>;
    fn opening(&self, target: &OfferTarget) -> Result<Option<Opening>, RepositoryError>;
    fn save_opening(&self, opening: Opening) -> Result<(), RepositoryError>;
    fn openings(&self) -> Result<Vec<Opening>, RepositoryError>;
}

pub trait BookmarkRepository: Send + Sync {
    fn add_bookmark(&self, bookmark: Bookmark) -> Result<Bookmark, RepositoryError>;
    fn remove_bookmark(
        &self,
        candidate_id: &CandidateId,
        company_id: &str,
        job_id: &str,
    ) -> Result<(), RepositoryError>;
    fn bookmarks(&self, candidate_id: &CandidateId) -> Result<Vec<Bookmark>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// A batch that stopped partway; earlier writes stay applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("batch write applied {} operation(s), {} failed", .applied.len(), .failed.len())]
pub struct BatchError {
    pub applied: Vec<ApplicationId>,
    pub failed: Vec<(ApplicationId, RepositoryError)>,
}

/// Outbound hook used to tell candidates about offers.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: CandidateId,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
