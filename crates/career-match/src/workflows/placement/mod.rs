//! Course admissions and job placements for candidates.
//!
//! Candidates publish a profile, institutions and companies publish openings, and the
//! matcher gates and scores applications against each opening's requirements. Offers are
//! resolved per decision group so that a candidate ends with at most one confirmed course
//! and one accepted job; declined job offers roll over to the best waitlisted applicant.

pub mod domain;
pub mod feed;
pub mod matching;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationStatusView, Bookmark, CandidateId,
    CandidateProfile, DecisionDomain, EducationLevel, LetterGrade, MatchPath, OfferTarget,
    Opening, RequirementSet,
};
pub use feed::{ApplicationChange, ApplicationFeed, LiveApplications};
pub use matching::{
    check as check_eligibility, is_eligible, score, EligibilityReport, IneligibilityReason,
    MatchBreakdown, MatchCriterion, MatchEngine, MatchingConfig, Normalization, ScoreComponent,
    ScoreWeights, COURSE_WEIGHTS, DEFAULT_MAX_PENDING_PER_INSTITUTION, JOB_WEIGHTS,
};
pub use repository::{
    ApplicationQuery, ApplicationRepository, BatchError, BatchOperation, BookmarkRepository,
    CatalogRepository, Notification, NotificationError, NotificationPublisher, RepositoryError,
};
pub use resolver::{
    plan_selection, rank_waitlist, resolution_prompt, CascadeFailure, CascadeReport, CascadeStep,
    DeclineOutcome, NotificationStatus, OfferResolver, ResolutionError, ResolutionPrompt,
    ResolverError, SelectionPlan,
};
pub use router::placement_router;
pub use service::{
    ApplicationOutcome, MatchPreview, PlacementService, PlacementServiceError, StatusChange,
};
pub use validation::{sanitize_opening, sanitize_profile, ValidationError, MAX_GPA};
