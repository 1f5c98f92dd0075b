use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::workflows::placement::domain::{
    Application, ApplicationId, ApplicationStatus, Bookmark, CandidateId, CandidateProfile,
    EducationLevel, LetterGrade, OfferTarget, Opening, RequirementSet,
};
use crate::workflows::placement::feed::{ApplicationChange, ApplicationFeed};
use crate::workflows::placement::repository::{
    ApplicationQuery, ApplicationRepository, BatchError, BatchOperation, BookmarkRepository,
    CatalogRepository, Notification, NotificationError, NotificationPublisher, RepositoryError,
};
use crate::workflows::placement::{placement_router, MatchingConfig, PlacementService};

pub(super) type MemoryService =
    PlacementService<MemoryStore, MemoryStore, MemoryStore, MemoryNotifier>;

pub(super) fn candidate_id(raw: &str) -> CandidateId {
    CandidateId(raw.to_string())
}

pub(super) fn app_id(raw: &str) -> ApplicationId {
    ApplicationId(raw.to_string())
}

pub(super) fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Computer science graduate with strong maths grades.
pub(super) fn graduate(id: &str) -> CandidateProfile {
    CandidateProfile {
        candidate_id: candidate_id(id),
        gpa: Some(3.8),
        experience_years: 1,
        skills: BTreeSet::from(["SQL".to_string(), "Python".to_string()]),
        education_level: Some(EducationLevel::Bachelors),
        subject_grades: BTreeMap::from([
            ("Mathematics".to_string(), LetterGrade::A),
            ("Physics".to_string(), LetterGrade::B),
        ]),
        field_of_study: Some("Computer Science".to_string()),
    }
}

pub(super) fn analyst_job() -> Opening {
    Opening {
        target: OfferTarget::job("acme", "data-analyst"),
        title: "Data Analyst".to_string(),
        requirements: RequirementSet {
            min_gpa: Some(3.5),
            field: Some("computer science".to_string()),
            skills: vec!["SQL".to_string()],
            ..RequirementSet::default()
        },
    }
}

pub(super) fn course(institution: &str, course: &str) -> Opening {
    Opening {
        target: OfferTarget::course(institution, course),
        title: format!("BSc {course}"),
        requirements: RequirementSet {
            min_gpa: Some(3.0),
            field: Some("science".to_string()),
            subject_grades: BTreeMap::from([("Mathematics".to_string(), LetterGrade::B)]),
            ..RequirementSet::default()
        },
    }
}

pub(super) fn application(
    id: &str,
    candidate: &str,
    target: OfferTarget,
    status: ApplicationStatus,
    match_score: u8,
    applied_on: u32,
) -> Application {
    Application {
        id: app_id(id),
        candidate_id: candidate_id(candidate),
        target,
        status,
        match_score,
        applied_at: day(applied_on),
        decision_made: false,
        final_choice: false,
    }
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    build_service_with(MatchingConfig::default())
}

pub(super) fn build_service_with(
    config: MatchingConfig,
) -> (MemoryService, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = PlacementService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
        config,
    );
    (service, store, notifier)
}

/// Service with the default fixtures published and `cand-1` registered.
pub(super) fn seeded_service() -> (MemoryService, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    let (service, store, notifier) = build_service();
    service
        .save_profile(graduate("cand-1"))
        .expect("profile saved");
    service
        .publish_opening(analyst_job())
        .expect("job published");
    let courses = [
        ("inst-1", "physics"),
        ("inst-1", "maths"),
        ("inst-1", "chemistry"),
        ("inst-2", "computing"),
    ];
    for (institution, name) in courses {
        service
            .publish_opening(course(institution, name))
            .expect("course published");
    }
    (service, store, notifier)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    placement_router(Arc::new(service))
}

/// In-memory store backing every placement repository, with per-record failure injection.
pub(super) struct MemoryStore {
    applications: Mutex<BTreeMap<ApplicationId, Application>>,
    profiles: Mutex<HashMap<CandidateId, CandidateProfile>>,
    openings: Mutex<Vec<Opening>>,
    bookmarks: Mutex<Vec<Bookmark>>,
    failing_deletes: Mutex<BTreeSet<ApplicationId>>,
    failing_updates: Mutex<BTreeSet<ApplicationId>>,
    failing_queries: AtomicBool,
    batches: Mutex<Vec<Vec<BatchOperation>>>,
    changes: broadcast::Sender<ApplicationChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            applications: Mutex::new(BTreeMap::new()),
            profiles: Mutex::new(HashMap::new()),
            openings: Mutex::new(Vec::new()),
            bookmarks: Mutex::new(Vec::new()),
            failing_deletes: Mutex::new(BTreeSet::new()),
            failing_updates: Mutex::new(BTreeSet::new()),
            failing_queries: AtomicBool::new(false),
            batches: Mutex::new(Vec::new()),
            changes,
        }
    }
}

impl MemoryStore {
    pub(super) fn seed(&self, applications: Vec<Application>) {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        for application in applications {
            guard.insert(application.id.clone(), application);
        }
    }

    pub(super) fn get(&self, id: &str) -> Option<Application> {
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .get(&app_id(id))
            .cloned()
    }

    pub(super) fn all(&self) -> Vec<Application> {
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub(super) fn fail_delete(&self, id: &str) {
        self.failing_deletes
            .lock()
            .expect("store mutex poisoned")
            .insert(app_id(id));
    }

    pub(super) fn fail_update(&self, id: &str) {
        self.failing_updates
            .lock()
            .expect("store mutex poisoned")
            .insert(app_id(id));
    }

    pub(super) fn fail_queries(&self) {
        self.failing_queries.store(true, Ordering::SeqCst);
    }

    /// Every batch the store was asked to apply, in order.
    pub(super) fn batches(&self) -> Vec<Vec<BatchOperation>> {
        self.batches.lock().expect("store mutex poisoned").clone()
    }

    fn rescore(&self, id: &ApplicationId, match_score: u8) -> Result<(), RepositoryError> {
        if self
            .failing_updates
            .lock()
            .expect("store mutex poisoned")
            .contains(id)
        {
            return Err(RepositoryError::Unavailable("update rejected".to_string()));
        }
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        let Some(application) = guard.get_mut(id) else {
            return Err(RepositoryError::NotFound);
        };
        application.match_score = match_score;
        let updated = application.clone();
        drop(guard);
        self.publish(ApplicationChange::Upserted(updated));
        Ok(())
    }

    fn publish(&self, change: ApplicationChange) {
        let _ = self.changes.send(change);
    }
}

impl ApplicationRepository for MemoryStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        drop(guard);
        self.publish(ApplicationChange::Upserted(application.clone()));
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn query(&self, query: &ApplicationQuery) -> Result<Vec<Application>, RepositoryError> {
        if self.failing_queries.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("query rejected".to_string()));
        }
        let guard = self.applications.lock().expect("store mutex poisoned");
        let mut matches: Vec<Application> = guard
            .values()
            .filter(|application| query.matches(application))
            .cloned()
            .collect();
        matches.sort_by(|left, right| {
            left.applied_at
                .cmp(&right.applied_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(matches)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        if self
            .failing_updates
            .lock()
            .expect("store mutex poisoned")
            .contains(&application.id)
        {
            return Err(RepositoryError::Unavailable("update rejected".to_string()));
        }
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        if !guard.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(application.id.clone(), application.clone());
        drop(guard);
        self.publish(ApplicationChange::Upserted(application));
        Ok(())
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        if self
            .failing_deletes
            .lock()
            .expect("store mutex poisoned")
            .contains(id)
        {
            return Err(RepositoryError::Unavailable("delete rejected".to_string()));
        }
        let removed = self
            .applications
            .lock()
            .expect("store mutex poisoned")
            .remove(id);
        match removed {
            Some(_) => {
                self.publish(ApplicationChange::Removed { id: id.clone() });
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn apply_batch(&self, operations: Vec<BatchOperation>) -> Result<(), BatchError> {
        self.batches
            .lock()
            .expect("store mutex poisoned")
            .push(operations.clone());
        let mut applied = Vec::new();
        let mut failed = Vec::new();
        for operation in operations {
            let id = operation.application_id().clone();
            let result = match operation {
                BatchOperation::Update(application) => self.update(application),
                BatchOperation::Rescore { id, match_score } => self.rescore(&id, match_score),
                BatchOperation::Delete(id) => self.delete(&id),
            };
            match result {
                Ok(()) => applied.push(id),
                Err(err) => failed.push((id, err)),
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BatchError { applied, failed })
        }
    }

    fn subscribe(&self, query: ApplicationQuery) -> Result<ApplicationFeed, RepositoryError> {
        let receiver = self.changes.subscribe();
        let initial = self.query(&query)?;
        Ok(ApplicationFeed::new(query, initial, receiver))
    }
}

impl CatalogRepository for MemoryStore {
    fn profile(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Option<CandidateProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("store mutex poisoned");
        Ok(guard.get(candidate_id).cloned())
    }

    fn save_profile(&self, profile: CandidateProfile) -> Result<(), RepositoryError> {
        let mut guard = self.profiles.lock().expect("store mutex poisoned");
        guard.insert(profile.candidate_id.clone(), profile);
        Ok(())
    }

    fn opening(&self, target: &OfferTarget) -> Result<Option<Opening>, RepositoryError> {
        let guard = self.openings.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|opening| &opening.target == target).cloned())
    }

    fn save_opening(&self, opening: Opening) -> Result<(), RepositoryError> {
        let mut guard = self.openings.lock().expect("store mutex poisoned");
        guard.retain(|existing| existing.target != opening.target);
        guard.push(opening);
        Ok(())
    }

    fn openings(&self) -> Result<Vec<Opening>, RepositoryError> {
        Ok(self.openings.lock().expect("store mutex poisoned").clone())
    }
}

impl BookmarkRepository for MemoryStore {
    fn add_bookmark(&self, bookmark: Bookmark) -> Result<Bookmark, RepositoryError> {
        let mut guard = self.bookmarks.lock().expect("store mutex poisoned");
        if guard.iter().any(|existing| {
            existing.candidate_id == bookmark.candidate_id
                && existing.company_id == bookmark.company_id
                && existing.job_id == bookmark.job_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(bookmark.clone());
        Ok(bookmark)
    }

    fn remove_bookmark(
        &self,
        candidate_id: &CandidateId,
        company_id: &str,
        job_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.bookmarks.lock().expect("store mutex poisoned");
        let before = guard.len();
        guard.retain(|existing| {
            !(&existing.candidate_id == candidate_id
                && existing.company_id == company_id
                && existing.job_id == job_id)
        });
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    fn bookmarks(&self, candidate_id: &CandidateId) -> Result<Vec<Bookmark>, RepositoryError> {
        let guard = self.bookmarks.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|bookmark| &bookmark.candidate_id == candidate_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    offline: Mutex<bool>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn go_offline(&self) {
        *self.offline.lock().expect("notifier mutex poisoned") = true;
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        if *self.offline.lock().expect("notifier mutex poisoned") {
            return Err(NotificationError::Transport("smtp offline".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
