use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::rng::SeededStream;
use super::{seconds_within, BACKFILL_SNOOZE_DAYS, BACKFILL_SNOOZE_NOTE, DAY_SECS};
use crate::domain::recommendation::{Annotation, Note, Priority, Recommendation, Status};
use crate::lifecycle::{self, LifecycleError, StatusEvent};

const ARCHIVE_WINDOW_DAYS: i64 = 270;
const ACTIONED_WINDOW_DAYS: i64 = 90;

/// Gives every snoozed record a snooze window and rationale. Already complete records are
/// left alone, so running it twice changes nothing.
pub(crate) fn backfill_snoozes(records: &mut [Recommendation], now: DateTime<Utc>) -> usize {
    let mut backfilled = 0;
    for record in records.iter_mut().filter(|record| record.status == Status::Snoozed) {
        let fallback_note = || Note {
            note: BACKFILL_SNOOZE_NOTE.to_owned(),
            owner: record.owner.clone(),
            timestamp: now,
        };
        let fallback_until = now + Duration::days(BACKFILL_SNOOZE_DAYS);

        let repaired = match &record.annotation {
            Some(Annotation::Snooze { note: Some(_), until: Some(_) }) => continue,
            Some(Annotation::Snooze { note, until }) => Annotation::Snooze {
                note: Some(note.clone().unwrap_or_else(fallback_note)),
                until: Some(until.unwrap_or(fallback_until)),
            },
            _ => Annotation::Snooze { note: Some(fallback_note()), until: Some(fallback_until) },
        };
        record.annotation = Some(repaired);
        backfilled += 1;
    }

    if backfilled > 0 {
        tracing::warn!(
            event_name = "generator.snooze_backfilled",
            records = backfilled,
            "snoozed records were missing a window or rationale"
        );
    }
    backfilled
}

/// Assigns an archive window of up to 270 days after creation to archived records that
/// have none yet.
pub(crate) fn assign_archive_windows(
    records: &mut [Recommendation],
    stream: &mut SeededStream,
) -> usize {
    let mut assigned = 0;
    for record in records.iter_mut().filter(|record| record.status == Status::Archived) {
        let created_at = record.created_at;
        if let Some(Annotation::Archive { until, .. }) = &mut record.annotation {
            if until.is_none() {
                let offset = seconds_within(stream.next_unit(), ARCHIVE_WINDOW_DAYS * DAY_SECS);
                *until = Some(created_at + Duration::seconds(offset));
                assigned += 1;
            }
        }
    }
    assigned
}

/// Demotes archived records whose window closed at or before `now` to `Re-visit`.
pub(crate) fn expire_archives(
    records: &mut [Recommendation],
    now: DateTime<Utc>,
) -> Result<usize, LifecycleError> {
    let mut expired = 0;
    for record in records.iter_mut() {
        let elapsed = record.status == Status::Archived
            && record.archived_until().is_some_and(|until| until <= now);
        if elapsed {
            lifecycle::apply(record, StatusEvent::ArchiveExpired, None)?;
            expired += 1;
        }
    }

    tracing::info!(
        event_name = "generator.archive_expired",
        records = expired,
        "elapsed archive windows demoted to re-visit"
    );
    Ok(expired)
}

/// Promotes the first `quota` eligible medium-priority records of each category to
/// `Actioned`, in array order.
pub(crate) fn apply_actioned_quotas(
    records: &mut [Recommendation],
    quotas: &[(&'static str, usize)],
    stream: &mut SeededStream,
    now: DateTime<Utc>,
) -> Result<BTreeMap<String, usize>, LifecycleError> {
    let mut applied = BTreeMap::new();
    for (category, quota) in quotas {
        let mut promoted = 0;
        for record in records.iter_mut() {
            if promoted == *quota {
                break;
            }
            let eligible = record.category == *category
                && record.priority == Priority::Medium
                && lifecycle::can_apply(record.status, StatusEvent::QuotaActioned);
            if !eligible {
                continue;
            }

            let offset = seconds_within(stream.next_unit(), ACTIONED_WINDOW_DAYS * DAY_SECS);
            let at =
                (now - Duration::seconds(offset)).max(record.created_at + Duration::minutes(1));
            let annotation = Some(Annotation::Actioned { at });
            lifecycle::apply(record, StatusEvent::QuotaActioned, annotation)?;
            promoted += 1;
        }

        if promoted < *quota {
            tracing::warn!(
                event_name = "generator.quota_shortfall",
                category = *category,
                quota = *quota,
                promoted,
                "not enough eligible medium-priority records to meet actioned quota"
            );
        }
        applied.insert((*category).to_owned(), promoted);
    }
    Ok(applied)
}
