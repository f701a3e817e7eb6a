//! Caller-owned status changes layered over an immutable [`Dataset`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::dataset::Dataset;
use crate::domain::recommendation::{Recommendation, RecommendationId, Status};
use crate::lifecycle::{self, LifecycleError, StatusEvent, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    #[error("recommendation {0} does not exist in this dataset")]
    UnknownRecommendation(RecommendationId),
    #[error("recommendation {id}: {source}")]
    Lifecycle {
        id: RecommendationId,
        #[source]
        source: LifecycleError,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub applied: Vec<(RecommendationId, TransitionOutcome)>,
    pub rejected: Vec<(RecommendationId, String)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusOverlay {
    statuses: BTreeMap<RecommendationId, Status>,
    sent: BTreeSet<RecommendationId>,
}

impl StatusOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RecommendationId) -> Option<Status> {
        self.statuses.get(&id).copied()
    }

    /// The overlaid status if one was recorded, otherwise the stored one.
    pub fn effective_status(&self, record: &Recommendation) -> Status {
        self.get(record.id).unwrap_or(record.status)
    }

    pub fn apply(
        &mut self,
        dataset: &Dataset,
        id: RecommendationId,
        event: StatusEvent,
    ) -> Result<TransitionOutcome, OverlayError> {
        let record = dataset.get(id).ok_or(OverlayError::UnknownRecommendation(id))?;
        let outcome = lifecycle::transition(self.effective_status(record), event)
            .map_err(|source| OverlayError::Lifecycle { id, source })?;
        self.statuses.insert(id, outcome.to);

        tracing::debug!(
            event_name = "overlay.status_changed",
            id = id.0,
            from = %outcome.from,
            to = %outcome.to,
            "overlay status updated"
        );
        Ok(outcome)
    }

    /// Applies `event` to each id, skipping the ones it does not fit.
    pub fn apply_bulk(
        &mut self,
        dataset: &Dataset,
        ids: &[RecommendationId],
        event: StatusEvent,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.apply(dataset, *id, event) {
                Ok(transition) => outcome.applied.push((*id, transition)),
                Err(error) => outcome.rejected.push((*id, error.to_string())),
            }
        }
        if !outcome.rejected.is_empty() {
            tracing::warn!(
                event_name = "overlay.bulk_partially_applied",
                applied = outcome.applied.len(),
                rejected = outcome.rejected.len(),
                "bulk action skipped recommendations in incompatible states"
            );
        }
        outcome
    }

    /// Drops the overlaid status so the stored one shows through again.
    pub fn reset(&mut self, id: RecommendationId) -> Option<Status> {
        self.statuses.remove(&id)
    }

    /// Marks the recommendation as handed to an external integration. Status is unchanged
    /// and nothing leaves the process.
    pub fn send_to_integration(
        &mut self,
        dataset: &Dataset,
        id: RecommendationId,
    ) -> Result<bool, OverlayError> {
        if !dataset.contains(id) {
            return Err(OverlayError::UnknownRecommendation(id));
        }
        Ok(self.sent.insert(id))
    }

    pub fn was_sent(&self, id: RecommendationId) -> bool {
        self.sent.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecommendationId, Status)> + '_ {
        self.statuses.iter().map(|(id, status)| (*id, *status))
    }
}
