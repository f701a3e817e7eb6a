//! Recommendation status lifecycle.
//!
//! All status changes, whether applied by generation passes or by a caller's overlay,
//! go through [`transition`]. Generation uses the system events
//! ([`StatusEvent::ArchiveExpired`], [`StatusEvent::QuotaActioned`]); dashboard bulk
//! actions map onto the remaining events.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::recommendation::{Annotation, Recommendation, Status};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    View,
    Archive,
    Snooze,
    MarkForReview,
    Action,
    Restore,
    SnoozeElapsed,
    ArchiveExpired,
    QuotaActioned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: Status,
    pub to: Status,
    pub event: StatusEvent,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid status transition from {status} using event {event:?}")]
    InvalidTransition { status: Status, event: StatusEvent },
    #[error("annotation for {annotation} cannot be attached to a {status} recommendation")]
    AnnotationMismatch { status: Status, annotation: Status },
}

pub fn transition(
    current: Status,
    event: StatusEvent,
) -> Result<TransitionOutcome, LifecycleError> {
    use Status::{Actioned, Archived, MarkedForReview, New, ReVisit, Snoozed, Viewed};
    use StatusEvent::{
        Action, Archive, ArchiveExpired, MarkForReview, QuotaActioned, Restore, Snooze,
        SnoozeElapsed, View,
    };

    let to = match (current, event) {
        (New, View) => Viewed,
        (New | Viewed | ReVisit | Snoozed | MarkedForReview, Archive) => Archived,
        (New | Viewed | ReVisit | MarkedForReview, Snooze) => Snoozed,
        (New | Viewed | ReVisit | Snoozed, MarkForReview) => MarkedForReview,
        (New | Viewed | ReVisit | Snoozed | MarkedForReview, Action) => Actioned,
        (Archived | Snoozed, Restore) => ReVisit,
        (Snoozed, SnoozeElapsed) => ReVisit,
        (Archived, ArchiveExpired) => ReVisit,
        (New | Viewed | ReVisit | MarkedForReview, QuotaActioned) => Actioned,
        _ => return Err(LifecycleError::InvalidTransition { status: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event })
}

pub fn can_apply(current: Status, event: StatusEvent) -> bool {
    transition(current, event).is_ok()
}

/// Moves `record` through `event`, replacing its annotation.
///
/// `annotation` must belong to the target status; statuses without a payload take `None`.
/// The record is left untouched on error.
pub fn apply(
    record: &mut Recommendation,
    event: StatusEvent,
    annotation: Option<Annotation>,
) -> Result<TransitionOutcome, LifecycleError> {
    let outcome = transition(record.status, event)?;
    if let Some(annotation) = &annotation {
        if annotation.status() != outcome.to {
            return Err(LifecycleError::AnnotationMismatch {
                status: outcome.to,
                annotation: annotation.status(),
            });
        }
    }

    record.status = outcome.to;
    record.annotation = annotation;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use super::{apply, can_apply, transition, LifecycleError, StatusEvent};
    use crate::domain::recommendation::{
        Annotation, Ease, Note, Priority, Recommendation, RecommendationId, SavingsPeriod, Status,
    };

    fn archived_record() -> Recommendation {
        Recommendation {
            id: RecommendationId(1),
            title: "Delete orphaned snapshots".to_owned(),
            description: "Snapshots older than 90 days".to_owned(),
            savings: Decimal::from(640),
            savings_formatted: "$640".to_owned(),
            period: SavingsPeriod::Monthly,
            provider: "Azure".to_owned(),
            status: Status::Archived,
            owner: "Tom Okafor".to_owned(),
            priority: Priority::Medium,
            category: "Storage Optimization".to_owned(),
            sub_category: Some("Snapshots".to_owned()),
            tag_type: "environment".to_owned(),
            tag_value: "staging".to_owned(),
            ease_to_implement: Ease::Medium,
            created_at: DateTime::<Utc>::default(),
            created_date: "Jan 1, 1970".to_owned(),
            annotation: Some(Annotation::Archive {
                note: Note {
                    note: "Retained for audit".to_owned(),
                    owner: "Tom Okafor".to_owned(),
                    timestamp: DateTime::<Utc>::default(),
                },
                until: None,
            }),
        }
    }

    #[test]
    fn archive_expiry_moves_archived_to_revisit() {
        let outcome = transition(Status::Archived, StatusEvent::ArchiveExpired)
            .expect("archived -> re-visit");
        assert_eq!(outcome.to, Status::ReVisit);
        assert_eq!(outcome.from, Status::Archived);
    }

    #[test]
    fn quota_promotion_only_applies_to_active_statuses() {
        for status in [Status::New, Status::Viewed, Status::ReVisit, Status::MarkedForReview] {
            assert_eq!(
                transition(status, StatusEvent::QuotaActioned).map(|outcome| outcome.to),
                Ok(Status::Actioned)
            );
        }
        for status in [Status::Snoozed, Status::Archived, Status::Actioned] {
            assert_eq!(
                transition(status, StatusEvent::QuotaActioned),
                Err(LifecycleError::InvalidTransition {
                    status,
                    event: StatusEvent::QuotaActioned
                })
            );
        }
    }

    #[test]
    fn actioned_is_terminal() {
        for event in [
            StatusEvent::View,
            StatusEvent::Archive,
            StatusEvent::Snooze,
            StatusEvent::MarkForReview,
            StatusEvent::Action,
            StatusEvent::Restore,
            StatusEvent::SnoozeElapsed,
            StatusEvent::ArchiveExpired,
            StatusEvent::QuotaActioned,
        ] {
            assert!(!can_apply(Status::Actioned, event), "{event:?} should be rejected");
        }
    }

    #[test]
    fn view_only_applies_to_new() {
        assert!(can_apply(Status::New, StatusEvent::View));
        assert!(!can_apply(Status::Viewed, StatusEvent::View));
        assert!(!can_apply(Status::Archived, StatusEvent::View));
    }

    #[test]
    fn apply_clears_annotation_on_expiry() {
        let mut record = archived_record();
        apply(&mut record, StatusEvent::ArchiveExpired, None).expect("expire archive");

        assert_eq!(record.status, Status::ReVisit);
        assert!(record.annotation.is_none());
        assert!(record.archive_note().is_none());
        assert!(record.archived_until().is_none());
    }

    #[test]
    fn apply_rejects_mismatched_annotation_without_mutating() {
        let mut record = archived_record();
        let before = record.clone();
        let error = apply(
            &mut record,
            StatusEvent::ArchiveExpired,
            Some(Annotation::Actioned { at: DateTime::<Utc>::default() }),
        )
        .expect_err("re-visit takes no annotation");

        assert_eq!(
            error,
            LifecycleError::AnnotationMismatch {
                status: Status::ReVisit,
                annotation: Status::Actioned
            }
        );
        assert_eq!(record, before);
    }
}
