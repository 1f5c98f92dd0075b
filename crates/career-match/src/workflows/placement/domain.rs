use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for student/applicant profiles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Highest completed education level, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    Diploma,
    Bachelors,
    Masters,
    Phd,
}

impl EducationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            EducationLevel::HighSchool => "high_school",
            EducationLevel::Diploma => "diploma",
            EducationLevel::Bachelors => "bachelors",
            EducationLevel::Masters => "masters",
            EducationLevel::Phd => "phd",
        }
    }
}

/// Subject letter grade. Ordering follows the numeric table, so `A*` is the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A*")]
    AStar,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 7] = [
        LetterGrade::AStar,
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::E,
        LetterGrade::F,
    ];

    pub const fn points(self) -> u8 {
        match self {
            LetterGrade::AStar => 95,
            LetterGrade::A => 85,
            LetterGrade::B => 75,
            LetterGrade::C => 65,
            LetterGrade::D => 55,
            LetterGrade::E => 45,
            LetterGrade::F => 35,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LetterGrade::AStar => "A*",
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::E => "E",
            LetterGrade::F => "F",
        }
    }
}

impl PartialOrd for LetterGrade {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LetterGrade {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.points().cmp(&other.points())
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown letter grade '{0}'")]
pub struct UnknownGrade(pub String);

impl FromStr for LetterGrade {
    type Err = UnknownGrade;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        LetterGrade::ALL
            .into_iter()
            .find(|grade| grade.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownGrade(raw.to_string()))
    }
}

/// Student-owned snapshot consumed by matching and eligibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: CandidateId,
    #[serde(default)]
    pub gpa: Option<f32>,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
    #[serde(default)]
    pub subject_grades: BTreeMap<String, LetterGrade>,
    #[serde(default)]
    pub field_of_study: Option<String>,
}

impl CandidateProfile {
    pub fn new(candidate_id: CandidateId) -> Self {
        Self {
            candidate_id,
            gpa: None,
            experience_years: 0,
            skills: BTreeSet::new(),
            education_level: None,
            subject_grades: BTreeMap::new(),
            field_of_study: None,
        }
    }

    /// GPA used by numeric criteria; an unset GPA counts as zero.
    pub fn effective_gpa(&self) -> f32 {
        self.gpa.unwrap_or(0.0)
    }
}

/// Minimum qualifying criteria published with a course or job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementSet {
    #[serde(default)]
    pub min_gpa: Option<f32>,
    #[serde(default)]
    pub min_experience_years: Option<u32>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub subject_grades: BTreeMap<String, LetterGrade>,
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
}

/// Which scoring/eligibility rules apply to an opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPath {
    Course,
    Job,
}

/// Sibling grouping used when resolving concurrent offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionDomain {
    CourseAdmission,
    JobOffer,
}

impl DecisionDomain {
    /// Status an authority sets when extending an offer in this domain.
    pub const fn offer_status(self) -> ApplicationStatus {
        match self {
            DecisionDomain::CourseAdmission => ApplicationStatus::Admitted,
            DecisionDomain::JobOffer => ApplicationStatus::Offered,
        }
    }

    /// Status written when the candidate keeps an offer.
    pub const fn final_status(self) -> ApplicationStatus {
        match self {
            DecisionDomain::CourseAdmission => ApplicationStatus::Confirmed,
            DecisionDomain::JobOffer => ApplicationStatus::Accepted,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DecisionDomain::CourseAdmission => "course_admission",
            DecisionDomain::JobOffer => "job_offer",
        }
    }
}

/// The course or job an application points at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfferTarget {
    Course {
        institution_id: String,
        course_id: String,
    },
    Job {
        company_id: String,
        job_id: String,
    },
}

impl OfferTarget {
    pub fn course(institution_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        OfferTarget::Course {
            institution_id: institution_id.into(),
            course_id: course_id.into(),
        }
    }

    pub fn job(company_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        OfferTarget::Job {
            company_id: company_id.into(),
            job_id: job_id.into(),
        }
    }

    pub const fn path(&self) -> MatchPath {
        match self {
            OfferTarget::Course { .. } => MatchPath::Course,
            OfferTarget::Job { .. } => MatchPath::Job,
        }
    }

    pub const fn domain(&self) -> DecisionDomain {
        match self {
            OfferTarget::Course { .. } => DecisionDomain::CourseAdmission,
            OfferTarget::Job { .. } => DecisionDomain::JobOffer,
        }
    }

    /// Institution or company that owns the opening.
    pub fn owner_id(&self) -> &str {
        match self {
            OfferTarget::Course { institution_id, .. } => institution_id,
            OfferTarget::Job { company_id, .. } => company_id,
        }
    }

    pub fn institution_id(&self) -> Option<&str> {
        match self {
            OfferTarget::Course { institution_id, .. } => Some(institution_id),
            OfferTarget::Job { .. } => None,
        }
    }
}

impl fmt::Display for OfferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferTarget::Course {
                institution_id,
                course_id,
            } => write!(f, "course {institution_id}/{course_id}"),
            OfferTarget::Job { company_id, job_id } => write!(f, "job {company_id}/{job_id}"),
        }
    }
}

/// A published course or job together with its requirement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub target: OfferTarget,
    pub title: String,
    #[serde(default)]
    pub requirements: RequirementSet,
}

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Review,
    Interview,
    #[serde(alias = "approved")]
    Offered,
    Hired,
    Admitted,
    Confirmed,
    Accepted,
    Rejected,
    Declined,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Review => "review",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Admitted => "admitted",
            ApplicationStatus::Confirmed => "confirmed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Declined => "declined",
        }
    }

    /// Still waiting on the counterpart authority.
    pub const fn is_awaiting_decision(self) -> bool {
        matches!(self, ApplicationStatus::Pending | ApplicationStatus::Review)
    }

    /// The candidate has kept this application as their final choice.
    pub const fn is_final_choice(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Confirmed | ApplicationStatus::Accepted | ApplicationStatus::Hired
        )
    }

    /// Authority-driven transitions. Confirmed/accepted/declined are owned by the resolver.
    pub fn can_transition_to(self, next: ApplicationStatus, domain: DecisionDomain) -> bool {
        use ApplicationStatus::*;
        match domain {
            DecisionDomain::CourseAdmission => matches!(
                (self, next),
                (Pending, Review | Admitted | Rejected)
                    | (Review, Admitted | Rejected)
                    | (Admitted, Rejected)
            ),
            DecisionDomain::JobOffer => matches!(
                (self, next),
                (Pending, Review | Interview | Offered | Rejected)
                    | (Review, Interview | Offered | Rejected)
                    | (Interview, Offered | Rejected)
                    | (Offered, Rejected)
                    | (Accepted, Hired)
            ),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted link between one candidate and one course or job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub candidate_id: CandidateId,
    pub target: OfferTarget,
    pub status: ApplicationStatus,
    pub match_score: u8,
    pub applied_at: DateTime<Utc>,
    #[serde(default)]
    pub decision_made: bool,
    #[serde(default)]
    pub final_choice: bool,
}

impl Application {
    pub fn domain(&self) -> DecisionDomain {
        self.target.domain()
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            candidate_id: self.candidate_id.clone(),
            target: self.target.clone(),
            status: self.status.label(),
            match_score: self.match_score,
            applied_at: self.applied_at,
            decision_made: self.decision_made,
            final_choice: self.final_choice,
        }
    }
}

/// Outward representation of an application for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub candidate_id: CandidateId,
    pub target: OfferTarget,
    pub status: &'static str,
    pub match_score: u8,
    pub applied_at: DateTime<Utc>,
    pub decision_made: bool,
    pub final_choice: bool,
}

/// Candidate-to-job marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub candidate_id: CandidateId,
    pub company_id: String,
    pub job_id: String,
    pub created_at: DateTime<Utc>,
}
