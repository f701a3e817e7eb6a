use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::{Aggregator, StatusFilter, Totals, UnfilteredTotals};
use crate::domain::recommendation::{
    Annotation, Priority, Recommendation, RecommendationId, RecommendationRow, Status,
};
use crate::errors::DomainError;
use crate::overlay::StatusOverlay;
use crate::taxonomy::{DatasetKind, ValueClass};

/// Which status pool a generated sub-population drew from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPool {
    Primary,
    Secondary,
    SnoozedExtra,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub category: String,
    pub value_class: ValueClass,
    pub priority: Priority,
    pub pool: StatusPool,
    pub count: usize,
}

/// What each generation pass did. Lets tests check exact counts against the dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub populations: Vec<PopulationSummary>,
    pub snooze_backfilled: usize,
    pub archive_windows_assigned: usize,
    pub archives_expired: usize,
    pub quota_actioned: BTreeMap<String, usize>,
}

impl GenerationSummary {
    pub fn planned_count(&self, category: &str, priority: Priority) -> usize {
        self.populations
            .iter()
            .filter(|population| population.category == category && population.priority == priority)
            .map(|population| population.count)
            .sum()
    }

    pub fn total_planned(&self) -> usize {
        self.populations.iter().map(|population| population.count).sum()
    }
}

/// Projection of every record's stored priority, keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PriorityIndex {
    entries: BTreeMap<RecommendationId, Priority>,
}

impl PriorityIndex {
    fn build(records: &[Recommendation]) -> Self {
        Self { entries: records.iter().map(|record| (record.id, record.priority)).collect() }
    }

    pub fn get(&self, id: RecommendationId) -> Option<Priority> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecommendationId, Priority)> + '_ {
        self.entries.iter().map(|(id, priority)| (*id, *priority))
    }
}

/// Immutable result of one generation run plus the lookup structures built over it.
#[derive(Clone, Debug)]
pub struct Dataset {
    kind: DatasetKind,
    seed: u64,
    reference_time: DateTime<Utc>,
    records: Vec<Recommendation>,
    positions: HashMap<RecommendationId, usize>,
    priority_index: PriorityIndex,
    summary: GenerationSummary,
}

impl Dataset {
    pub(crate) fn generated(
        kind: DatasetKind,
        seed: u64,
        reference_time: DateTime<Utc>,
        records: Vec<Recommendation>,
        summary: GenerationSummary,
    ) -> Result<Self, DomainError> {
        let mut dataset = Self::from_records(kind, reference_time, records)?;
        dataset.seed = seed;
        dataset.summary = summary;
        Ok(dataset)
    }

    /// Wraps caller-built records. Ids must be unique and every record's annotation must
    /// belong to its status; order is preserved as given.
    pub fn from_records(
        kind: DatasetKind,
        reference_time: DateTime<Utc>,
        records: Vec<Recommendation>,
    ) -> Result<Self, DomainError> {
        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if positions.insert(record.id, position).is_some() {
                return Err(DomainError::DuplicateRecommendation(record.id));
            }
            check_status_coupling(record)?;
        }
        let priority_index = PriorityIndex::build(&records);

        Ok(Self {
            kind,
            seed: 0,
            reference_time,
            records,
            positions,
            priority_index,
            summary: GenerationSummary::default(),
        })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time
    }

    pub fn summary(&self) -> &GenerationSummary {
        &self.summary
    }

    pub fn records(&self) -> &[Recommendation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecommendationId) -> Option<&Recommendation> {
        self.positions.get(&id).and_then(|position| self.records.get(*position))
    }

    pub fn contains(&self, id: RecommendationId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn rows(&self) -> Vec<RecommendationRow> {
        self.records.iter().map(Recommendation::to_row).collect()
    }

    pub fn priority_map(&self) -> &PriorityIndex {
        &self.priority_index
    }

    pub fn aggregate(&self) -> Aggregator<'_> {
        Aggregator::new(self)
    }

    pub fn aggregate_with<'a>(&'a self, overlay: &'a StatusOverlay) -> Aggregator<'a> {
        Aggregator::with_overlay(self, overlay)
    }

    pub fn totals(&self, filter: Option<&StatusFilter>) -> Totals {
        self.aggregate().totals(filter)
    }

    pub fn unfiltered_totals(&self) -> UnfilteredTotals {
        self.aggregate().unfiltered_totals()
    }

    pub fn high_priority_count(&self, category: &str, filter: Option<&StatusFilter>) -> usize {
        self.aggregate().high_priority_count(category, filter)
    }
}

fn check_status_coupling(record: &Recommendation) -> Result<(), DomainError> {
    let annotated = record.annotation.as_ref().map(Annotation::status);
    let needs_annotation = !matches!(record.status, Status::New | Status::Viewed | Status::ReVisit);
    match annotated {
        Some(status) if status == record.status => Ok(()),
        None if !needs_annotation => Ok(()),
        Some(status) => Err(DomainError::InvariantViolation(format!(
            "recommendation {} is {} but carries {} details",
            record.id, record.status, status
        ))),
        None => Err(DomainError::InvariantViolation(format!(
            "recommendation {} is {} but carries no status details",
            record.id, record.status
        ))),
    }
}
