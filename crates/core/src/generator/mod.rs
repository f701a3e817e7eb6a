//! Deterministic recommendation generator.
//!
//! A run is a pure function of the taxonomy, the seed and the reference time. All random
//! choices come from one [`SeededStream`], so the order of draws is part of the output
//! format. Each record consumes exactly [`DRAWS_PER_RECORD`] draws, in this order:
//!
//! 1. provider
//! 2. title
//! 3. sub-category presence
//! 4. sub-category choice
//! 5. owner
//! 6. tag type
//! 7. tag value
//! 8. created offset within the last 60 days
//! 9. savings period
//! 10. ease to implement
//! 11. savings amount
//! 12. ticket reference presence
//! 13. ticket number
//! 14. status (drawn even when the status is fixed)
//! 15. note text
//! 16. note author
//! 17. status window (note timestamp, snooze length or actioned moment)
//!
//! Each sub-population draws one extra unit for its size before its records. The archive
//! window pass draws once per archived record and the quota pass once per promoted record.

mod passes;
pub mod rng;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::dataset::{Dataset, GenerationSummary, PopulationSummary, StatusPool};
use crate::domain::recommendation::{
    format_savings, Annotation, Ease, Note, Priority, Recommendation, RecommendationId,
    SavingsPeriod, Status,
};
use crate::errors::DomainError;
use crate::lifecycle::LifecycleError;
use crate::taxonomy::{CategorySpec, DatasetKind, Taxonomy, TaxonomyError, ValueClass};

pub use rng::SeededStream;

pub const DEFAULT_SEED: u64 = 0x5EED_C057;

/// 2025-06-01T00:00:00Z, the "now" used unless a caller supplies one.
pub const DEFAULT_REFERENCE_EPOCH_SECS: i64 = 1_748_736_000;

pub const DRAWS_PER_RECORD: u64 = 17;
pub const SNOOZED_EXTRAS: usize = 10;
pub const EXTRA_MULTIPLIER: f64 = 0.5;

pub(crate) const DAY_SECS: i64 = 24 * 60 * 60;
const CREATED_WINDOW_DAYS: i64 = 60;
const SNOOZE_MIN_DAYS: u64 = 7;
const SNOOZE_MAX_DAYS: u64 = 90;
const SUB_CATEGORY_RATE: f64 = 0.8;
const TICKET_RATE: f64 = 0.3;

/// (priority, pool, base count) for the six sub-populations of every category.
const POPULATIONS: [(Priority, StatusPool, usize); 6] = [
    (Priority::High, StatusPool::Primary, 4),
    (Priority::High, StatusPool::Secondary, 1),
    (Priority::Medium, StatusPool::Primary, 24),
    (Priority::Medium, StatusPool::Secondary, 3),
    (Priority::Low, StatusPool::Primary, 10),
    (Priority::Low, StatusPool::Secondary, 2),
];

const REVIEW_NOTES: &[&str] = &[
    "Needs sign-off from the service owner before change window",
    "Validate utilisation over a full billing cycle",
    "Check for contractual commitments first",
    "Confirm with finance whether this is budgeted",
];

const ARCHIVE_NOTES: &[&str] = &[
    "Workload is being decommissioned next quarter",
    "Duplicate of an existing recommendation",
    "Capacity is reserved for peak season",
    "Owned by a team outside this account",
];

const SNOOZE_NOTES: &[&str] = &[
    "Revisit after the current code freeze",
    "Waiting on migration to finish",
    "Blocked until renewal discussions start",
    "Deferred to next planning cycle",
];

pub(crate) const BACKFILL_SNOOZE_NOTE: &str = "Snoozed pending review";
pub(crate) const BACKFILL_SNOOZE_DAYS: i64 = 30;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationOptions {
    pub seed: u64,
    pub reference_time: DateTime<Utc>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { seed: DEFAULT_SEED, reference_time: default_reference_time() }
    }
}

pub fn default_reference_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(DEFAULT_REFERENCE_EPOCH_SECS, 0).unwrap_or_default()
}

/// Cloud dataset with the fixed seed and reference time.
pub fn generate() -> Result<Dataset, GenerationError> {
    generate_with(DatasetKind::Cloud, GenerationOptions::default())
}

pub fn generate_with(
    kind: DatasetKind,
    options: GenerationOptions,
) -> Result<Dataset, GenerationError> {
    Generator::new(*kind.taxonomy(), options)?.run()
}

enum StatusChoice {
    Pool(StatusPool),
    Fixed(Status),
}

pub struct Generator {
    taxonomy: Taxonomy,
    options: GenerationOptions,
    snooze_categories: Vec<&'static CategorySpec>,
}

impl Generator {
    /// Validates the taxonomy up front; a bad table never produces a partial dataset.
    pub fn new(taxonomy: Taxonomy, options: GenerationOptions) -> Result<Self, GenerationError> {
        taxonomy.validate()?;
        let categories: &'static [CategorySpec] = taxonomy.categories;
        let snooze_categories = taxonomy
            .snooze_categories
            .iter()
            .map(|name| {
                categories.iter().find(|category| category.name == *name).ok_or_else(|| {
                    TaxonomyError::UnknownCategory {
                        kind: taxonomy.kind,
                        table: "snooze subset",
                        category: *name,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { taxonomy, options, snooze_categories })
    }

    pub fn run(&self) -> Result<Dataset, GenerationError> {
        let now = self.options.reference_time;
        let mut stream = SeededStream::new(self.options.seed);
        let mut records = Vec::new();
        let mut summary = GenerationSummary::default();

        for category in self.taxonomy.categories {
            let value_class = self.taxonomy.value_class(category.name);
            let before = records.len();
            for (priority, pool, base) in POPULATIONS {
                let extra = (stream.next_unit() * base as f64 * EXTRA_MULTIPLIER) as usize;
                let count = base + extra;
                for _ in 0..count {
                    let id = next_id(&records);
                    let record = self.build_record(
                        &mut stream,
                        id,
                        category,
                        value_class,
                        priority,
                        StatusChoice::Pool(pool),
                    );
                    records.push(record);
                }
                summary.populations.push(PopulationSummary {
                    category: category.name.to_owned(),
                    value_class,
                    priority,
                    pool,
                    count,
                });
            }
            tracing::debug!(
                event_name = "generator.category_generated",
                dataset = %self.taxonomy.kind,
                category = category.name,
                value_class = ?value_class,
                records = records.len() - before,
                "category populations generated"
            );
        }

        for position in 0..SNOOZED_EXTRAS {
            let category = self.snooze_categories[position % self.snooze_categories.len()];
            let priority = match position {
                0..=2 => Priority::High,
                3..=6 => Priority::Medium,
                _ => Priority::Low,
            };
            let id = next_id(&records);
            let record = self.build_record(
                &mut stream,
                id,
                category,
                self.taxonomy.value_class(category.name),
                priority,
                StatusChoice::Fixed(Status::Snoozed),
            );
            records.push(record);
            summary.populations.push(PopulationSummary {
                category: category.name.to_owned(),
                value_class: self.taxonomy.value_class(category.name),
                priority,
                pool: StatusPool::SnoozedExtra,
                count: 1,
            });
        }

        summary.snooze_backfilled = passes::backfill_snoozes(&mut records, now);
        summary.archive_windows_assigned =
            passes::assign_archive_windows(&mut records, &mut stream);
        summary.archives_expired = passes::expire_archives(&mut records, now)?;
        summary.quota_actioned = passes::apply_actioned_quotas(
            &mut records,
            self.taxonomy.actioned_quotas,
            &mut stream,
            now,
        )?;

        tracing::info!(
            event_name = "generator.dataset_generated",
            dataset = %self.taxonomy.kind,
            seed = self.options.seed,
            records = records.len(),
            draws = stream.draws(),
            archives_expired = summary.archives_expired,
            "synthetic recommendation dataset generated"
        );

        Ok(Dataset::generated(self.taxonomy.kind, self.options.seed, now, records, summary)?)
    }

    fn build_record(
        &self,
        stream: &mut SeededStream,
        id: RecommendationId,
        category: &CategorySpec,
        value_class: ValueClass,
        priority: Priority,
        choice: StatusChoice,
    ) -> Recommendation {
        let now = self.options.reference_time;
        let taxonomy = &self.taxonomy;

        let provider = *stream.pick(taxonomy.providers);
        let title = *stream.pick(category.titles);
        let has_sub_category = stream.chance(SUB_CATEGORY_RATE);
        let sub_index = stream.index(category.sub_categories.len());
        let sub_category = category
            .sub_categories
            .get(sub_index)
            .filter(|_| has_sub_category)
            .map(|name| (*name).to_owned());
        let owner = *stream.pick(taxonomy.owners);
        let tag = stream.pick(taxonomy.tags);
        let tag_value = *stream.pick(tag.values);

        let created_offset =
            DAY_SECS + seconds_within(stream.next_unit(), (CREATED_WINDOW_DAYS - 1) * DAY_SECS);
        let created_at = now - Duration::seconds(created_offset);

        let period =
            if stream.chance(0.5) { SavingsPeriod::Monthly } else { SavingsPeriod::Annual };
        let ease = ease_for(priority, stream.next_unit());
        let (min, max) = value_class.savings_range(priority);
        let savings = Decimal::from(stream.range_inclusive(min, max));

        let has_ticket = stream.chance(TICKET_RATE);
        let ticket = stream.range_inclusive(100_000, 999_999);

        let status_unit = stream.next_unit();
        let status = match choice {
            StatusChoice::Pool(StatusPool::Primary) => primary_status(status_unit),
            StatusChoice::Pool(_) => secondary_status(status_unit),
            StatusChoice::Fixed(status) => status,
        };

        let note_unit = stream.next_unit();
        let note_owner = *stream.pick(taxonomy.owners);
        let window_unit = stream.next_unit();

        let elapsed = (now - created_at).num_seconds();
        let moment = created_at + Duration::seconds(seconds_within(window_unit, elapsed));
        let note = |texts: &[&str]| Note {
            note: texts[pick_index(note_unit, texts.len())].to_owned(),
            owner: note_owner.to_owned(),
            timestamp: moment,
        };
        let annotation = match status {
            Status::MarkedForReview => Some(Annotation::Review { note: note(REVIEW_NOTES) }),
            Status::Archived => {
                Some(Annotation::Archive { note: note(ARCHIVE_NOTES), until: None })
            }
            Status::Snoozed => {
                let days = SNOOZE_MIN_DAYS
                    + ((window_unit * (SNOOZE_MAX_DAYS - SNOOZE_MIN_DAYS + 1) as f64) as u64)
                        .min(SNOOZE_MAX_DAYS - SNOOZE_MIN_DAYS);
                Some(Annotation::Snooze {
                    note: Some(note(SNOOZE_NOTES)),
                    until: Some(now + Duration::days(days as i64)),
                })
            }
            Status::Actioned => {
                Some(Annotation::Actioned { at: (moment + Duration::minutes(1)).min(now) })
            }
            Status::New | Status::Viewed | Status::ReVisit => None,
        };

        let scope = sub_category.as_deref().unwrap_or(category.name);
        let mut description = format!(
            "{provider} {scope} opportunity tagged {}={tag_value}, owned by {owner}.",
            tag.tag_type
        );
        if has_ticket {
            description.push_str(&format!(" Tracked in SR{ticket:06}."));
        }

        Recommendation {
            id,
            title: title.to_owned(),
            description,
            savings,
            savings_formatted: format_savings(savings),
            period,
            provider: provider.to_owned(),
            status,
            owner: owner.to_owned(),
            priority,
            category: category.name.to_owned(),
            sub_category,
            tag_type: tag.tag_type.to_owned(),
            tag_value: tag_value.to_owned(),
            ease_to_implement: ease,
            created_at,
            created_date: created_at.format("%b %-d, %Y").to_string(),
            annotation,
        }
    }
}

fn next_id(records: &[Recommendation]) -> RecommendationId {
    RecommendationId(records.len() as u32 + 1)
}

/// Whole seconds in `[0, window)` for a unit draw; zero for an empty window.
pub(crate) fn seconds_within(unit: f64, window: i64) -> i64 {
    if window <= 0 {
        return 0;
    }
    ((unit * window as f64) as i64).clamp(0, window - 1)
}

fn pick_index(unit: f64, len: usize) -> usize {
    ((unit * len as f64) as usize).min(len.saturating_sub(1))
}

fn primary_status(unit: f64) -> Status {
    if unit < 0.5 {
        Status::New
    } else if unit < 0.8 {
        Status::Viewed
    } else {
        Status::MarkedForReview
    }
}

fn secondary_status(unit: f64) -> Status {
    Status::SECONDARY[pick_index(unit, Status::SECONDARY.len())]
}

fn ease_for(priority: Priority, unit: f64) -> Ease {
    match priority {
        Priority::High => Ease::Easy,
        Priority::Medium if unit < 0.5 => Ease::Easy,
        Priority::Medium => Ease::Medium,
        Priority::Low if unit < 0.5 => Ease::Medium,
        Priority::Low => Ease::Hard,
    }
}
