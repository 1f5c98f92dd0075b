use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use career_match::workflows::placement::{
    Application, ApplicationChange, ApplicationFeed, ApplicationId, ApplicationQuery,
    ApplicationRepository, BatchError, BatchOperation, Bookmark, BookmarkRepository, CandidateId,
    CandidateProfile, CatalogRepository, Notification, NotificationError, NotificationPublisher,
    OfferTarget, Opening, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::broadcast;
use tracing::info;

const FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct PlacementTables {
    applications: BTreeMap<ApplicationId, Application>,
    profiles: HashMap<CandidateId, CandidateProfile>,
    openings: BTreeMap<OfferTarget, Opening>,
    bookmarks: Vec<Bookmark>,
}

/// Process-local store backing every placement repository.
#[derive(Clone)]
pub(crate) struct InMemoryPlacementStore {
    tables: Arc<Mutex<PlacementTables>>,
    changes: broadcast::Sender<ApplicationChange>,
}

impl Default for InMemoryPlacementStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tables: Arc::new(Mutex::new(PlacementTables::default())),
            changes,
        }
    }
}

impl InMemoryPlacementStore {
    fn tables(&self) -> Result<MutexGuard<'_, PlacementTables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("placement store lock poisoned".to_string()))
    }

    fn announce(&self, change: ApplicationChange) {
        // no subscribers is not an error
        let _ = self.changes.send(change);
    }

    fn rescore(&self, id: &ApplicationId, match_score: u8) -> Result<(), RepositoryError> {
        let updated = {
            let mut tables = self.tables()?;
            let Some(slot) = tables.applications.get_mut(id) else {
                return Err(RepositoryError::NotFound);
            };
            slot.match_score = match_score;
            slot.clone()
        };
        self.announce(ApplicationChange::Upserted(updated));
        Ok(())
    }

    fn sorted(mut applications: Vec<Application>) -> Vec<Application> {
        applications.sort_by(|left, right| {
            left.applied_at
                .cmp(&right.applied_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        applications
    }
}

impl ApplicationRepository for InMemoryPlacementStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        {
            let mut tables = self.tables()?;
            if tables.applications.contains_key(&application.id) {
                return Err(RepositoryError::Conflict);
            }
            tables
                .applications
                .insert(application.id.clone(), application.clone());
        }
        self.announce(ApplicationChange::Upserted(application.clone()));
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(id).cloned())
    }

    fn query(&self, query: &ApplicationQuery) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.tables()?;
        let matches = tables
            .applications
            .values()
            .filter(|application| query.matches(application))
            .cloned()
            .collect();
        Ok(Self::sorted(matches))
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        {
            let mut tables = self.tables()?;
            let Some(slot) = tables.applications.get_mut(&application.id) else {
                return Err(RepositoryError::NotFound);
            };
            *slot = application.clone();
        }
        self.announce(ApplicationChange::Upserted(application));
        Ok(())
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        let removed = self.tables()?.applications.remove(id);
        match removed {
            Some(_) => {
                self.announce(ApplicationChange::Removed { id: id.clone() });
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn apply_batch(&self, operations: Vec<BatchOperation>) -> Result<(), BatchError> {
        let mut applied = Vec::with_capacity(operations.len());
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

impl CatalogRepository for InMemoryPlacementStore {
    fn profile(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Option<CandidateProfile>, RepositoryError> {
        Ok(self.tables()?.profiles.get(candidate_id).cloned())
    }

    fn save_profile(&self, profile: CandidateProfile) -> Result<(), RepositoryError> {
        self.tables()?
            .profiles
            .insert(profile.candidate_id.clone(), profile);
        Ok(())
    }

    fn opening(&self, target: &OfferTarget) -> Result<Option<Opening>, RepositoryError> {
        Ok(self.tables()?.openings.get(target).cloned())
    }

    fn save_opening(&self, opening: Opening) -> Result<(), RepositoryError> {
        self.tables()?
            .openings
            .insert(opening.target.clone(), opening);
        Ok(())
    }

    fn openings(&self) -> Result<Vec<Opening>, RepositoryError> {
        Ok(self.tables()?.openings.values().cloned().collect())
    }
}

impl BookmarkRepository for InMemoryPlacementStore {
    fn add_bookmark(&self, bookmark: Bookmark) -> Result<Bookmark, RepositoryError> {
        let mut tables = self.tables()?;
        let exists = tables.bookmarks.iter().any(|existing| {
            existing.candidate_id == bookmark.candidate_id
                && existing.company_id == bookmark.company_id
                && existing.job_id == bookmark.job_id
        });
        if exists {
            return Err(RepositoryError::Conflict);
        }
        tables.bookmarks.push(bookmark.clone());
        Ok(bookmark)
    }

    fn remove_bookmark(
        &self,
        candidate_id: &CandidateId,
        company_id: &str,
        job_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let before = tables.bookmarks.len();
        tables.bookmarks.retain(|bookmark| {
            !(&bookmark.candidate_id == candidate_id
                && bookmark.company_id == company_id
                && bookmark.job_id == job_id)
        });
        if tables.bookmarks.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    fn bookmarks(&self, candidate_id: &CandidateId) -> Result<Vec<Bookmark>, RepositoryError> {
        Ok(self
            .tables()?
            .bookmarks
            .iter()
            .filter(|bookmark| &bookmark.candidate_id == candidate_id)
            .cloned()
            .collect())
    }
}

/// Notification sink that logs each message and keeps it for inspection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for InMemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            application_id = %notification.application_id,
            "notification queued"
        );
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("notifier lock poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
