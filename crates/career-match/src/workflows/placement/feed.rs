//! Push-based application updates.
//!
//! Stores broadcast [`ApplicationChange`] events; each subscriber folds them into a
//! [`LiveApplications`] set filtered by its query and receives a fresh snapshot
//! whenever the filtered set changes.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::domain::{Application, ApplicationId};
use super::repository::ApplicationQuery;

/// Change notification emitted by a store after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ApplicationChange {
    Upserted(Application),
    Removed { id: ApplicationId },
}

/// Reducer holding the records that currently satisfy a query.
#[derive(Debug, Clone, Default)]
pub struct LiveApplications {
    query: ApplicationQuery,
    records: BTreeMap<ApplicationId, Application>,
}

impl LiveApplications {
    pub fn new(query: ApplicationQuery, initial: Vec<Application>) -> Self {
        let records = initial
            .into_iter()
            .filter(|application| query.matches(application))
            .map(|application| (application.id.clone(), application))
            .collect();
        Self { query, records }
    }

    /// Fold one change into the set, returning whether the visible set changed.
    pub fn apply(&mut self, change: &ApplicationChange) -> bool {
        match change {
            ApplicationChange::Upserted(application) => {
                if self.query.matches(application) {
                    let previous = self
                        .records
                        .insert(application.id.clone(), application.clone());
                    previous.as_ref() != Some(application)
                } else {
                    self.records.remove(&application.id).is_some()
                }
            }
            ApplicationChange::Removed { id } => self.records.remove(id).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Application> {
        let mut records: Vec<Application> = self.records.values().cloned().collect();
        records.sort_by(|left, right| {
            left.applied_at
                .cmp(&right.applied_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        records
    }
}

/// Live subscription returned by `ApplicationRepository::subscribe`.
#[derive(Debug)]
pub struct ApplicationFeed {
    receiver: broadcast::Receiver<ApplicationChange>,
    live: LiveApplications,
}

impl ApplicationFeed {
    pub fn new(
        query: ApplicationQuery,
        initial: Vec<Application>,
        receiver: broadcast::Receiver<ApplicationChange>,
    ) -> Self {
        Self {
            receiver,
            live: LiveApplications::new(query, initial),
        }
    }

    pub fn current(&self) -> Vec<Application> {
        self.live.snapshot()
    }

    /// Wait for the next change affecting this subscription. `None` once the store is gone.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Application>> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => {
                    if self.live.apply(&change) {
                        return Some(self.live.snapshot());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "application feed lagged behind store changes");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
