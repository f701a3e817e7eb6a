//! Savings totals and priority counts over a dataset, optionally seen through a
//! caller's status overlay. Nothing here mutates its input.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, PriorityIndex};
use crate::domain::recommendation::{Priority, Recommendation, Status};
use crate::overlay::StatusOverlay;

/// Union of selected statuses. An empty filter selects every record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFilter {
    statuses: BTreeSet<Status>,
}

impl StatusFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, status: Status) -> bool {
        self.statuses.insert(status)
    }

    pub fn union(&self, other: &StatusFilter) -> StatusFilter {
        Self { statuses: self.statuses.union(&other.statuses).copied().collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn contains(&self, status: Status) -> bool {
        self.statuses.contains(&status)
    }

    pub fn matches(&self, status: Status) -> bool {
        self.is_empty() || self.contains(status)
    }

    pub fn iter(&self) -> impl Iterator<Item = Status> + '_ {
        self.statuses.iter().copied()
    }
}

impl FromIterator<Status> for StatusFilter {
    fn from_iter<I: IntoIterator<Item = Status>>(iter: I) -> Self {
        Self { statuses: iter.into_iter().collect() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_savings: Decimal,
    pub total_count: usize,
    pub actioned_savings: Decimal,
    pub actioned_count: usize,
    pub category_savings: BTreeMap<String, Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilteredTotals {
    pub total_savings: Decimal,
    pub total_count: usize,
    pub actioned_savings: Decimal,
    pub actioned_count: usize,
}

impl From<Totals> for UnfilteredTotals {
    fn from(totals: Totals) -> Self {
        Self {
            total_savings: totals.total_savings,
            total_count: totals.total_count,
            actioned_savings: totals.actioned_savings,
            actioned_count: totals.actioned_count,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Aggregator<'a> {
    dataset: &'a Dataset,
    overlay: Option<&'a StatusOverlay>,
}

impl<'a> Aggregator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset, overlay: None }
    }

    pub fn with_overlay(dataset: &'a Dataset, overlay: &'a StatusOverlay) -> Self {
        Self { dataset, overlay: Some(overlay) }
    }

    pub fn effective_status(&self, record: &Recommendation) -> Status {
        self.overlay.map_or(record.status, |overlay| overlay.effective_status(record))
    }

    fn selected<'f>(
        &'f self,
        filter: Option<&'f StatusFilter>,
    ) -> impl Iterator<Item = (&'a Recommendation, Status)> + 'f {
        self.dataset
            .records()
            .iter()
            .map(move |record| (record, self.effective_status(record)))
            .filter(move |(_, status)| filter.map_or(true, |filter| filter.matches(*status)))
    }

    pub fn totals(&self, filter: Option<&StatusFilter>) -> Totals {
        let mut totals = Totals::default();
        for (record, status) in self.selected(filter) {
            totals.total_savings += record.savings;
            totals.total_count += 1;
            *totals.category_savings.entry(record.category.clone()).or_insert(Decimal::ZERO) +=
                record.savings;
            if status == Status::Actioned {
                totals.actioned_savings += record.savings;
                totals.actioned_count += 1;
            }
        }
        totals
    }

    /// Totals with no status filter; the stable denominator for percentage displays.
    pub fn unfiltered_totals(&self) -> UnfilteredTotals {
        self.totals(None).into()
    }

    pub fn priority_map(&self) -> &'a PriorityIndex {
        self.dataset.priority_map()
    }

    /// Records in `category` whose stored priority (read through the priority index) is high.
    pub fn high_priority_count(&self, category: &str, filter: Option<&StatusFilter>) -> usize {
        let index = self.priority_map();
        self.selected(filter)
            .filter(|(record, _)| record.category == category)
            .filter(|(record, _)| index.get(record.id) == Some(Priority::High))
            .count()
    }

    pub fn count_by_status(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for (_, status) in self.selected(None) {
            *counts.entry(status).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use super::{Aggregator, StatusFilter, Totals, UnfilteredTotals};
    use crate::dataset::Dataset;
    use crate::domain::recommendation::{
        Annotation, Ease, Priority, Recommendation, RecommendationId, SavingsPeriod, Status,
    };
    use crate::generator::generate;
    use crate::lifecycle::StatusEvent;
    use crate::overlay::StatusOverlay;
    use crate::taxonomy::DatasetKind;

    fn record(
        id: u32,
        category: &str,
        priority: Priority,
        status: Status,
        savings: i64,
    ) -> Recommendation {
        let annotation = (status == Status::Actioned)
            .then(|| Annotation::Actioned { at: DateTime::<Utc>::default() });
        Recommendation {
            id: RecommendationId(id),
            title: "Release unattached IP addresses".to_owned(),
            description: "Idle addresses".to_owned(),
            savings: Decimal::from(savings),
            savings_formatted: String::new(),
            period: SavingsPeriod::Monthly,
            provider: "Google Cloud".to_owned(),
            status,
            owner: "Elena Rossi".to_owned(),
            priority,
            category: category.to_owned(),
            sub_category: None,
            tag_type: "team".to_owned(),
            tag_value: "growth".to_owned(),
            ease_to_implement: Ease::Easy,
            created_at: DateTime::<Utc>::default(),
            created_date: String::new(),
            annotation,
        }
    }

    fn small_dataset(records: Vec<Recommendation>) -> Dataset {
        Dataset::from_records(DatasetKind::Cloud, DateTime::<Utc>::default(), records)
            .expect("unique ids")
    }

    fn fixture() -> Dataset {
        small_dataset(vec![
            record(1, "Reserved Instances", Priority::High, Status::New, 5_000),
            record(2, "Reserved Instances", Priority::High, Status::Actioned, 7_000),
            record(3, "Reserved Instances", Priority::Low, Status::Actioned, 900),
            record(4, "Idle Resources", Priority::High, Status::Viewed, 1_200),
            record(5, "Idle Resources", Priority::Medium, Status::New, 400),
        ])
    }

    #[test]
    fn totals_without_filter_cover_every_record() {
        let totals = fixture().totals(None);

        assert_eq!(totals.total_count, 5);
        assert_eq!(totals.total_savings, Decimal::from(14_500));
        assert_eq!(totals.actioned_count, 2);
        assert_eq!(totals.actioned_savings, Decimal::from(7_900));
        assert_eq!(totals.category_savings.get("Reserved Instances"), Some(&Decimal::from(12_900)));
        assert_eq!(totals.category_savings.get("Idle Resources"), Some(&Decimal::from(1_600)));
    }

    #[test]
    fn empty_filter_behaves_like_no_filter() {
        let dataset = generate().expect("generate");
        assert_eq!(dataset.totals(Some(&StatusFilter::new())), dataset.totals(None));
    }

    #[test]
    fn actioned_sums_respect_the_status_filter() {
        let dataset = fixture();
        let new_only: StatusFilter = [Status::New].into_iter().collect();
        let totals = dataset.totals(Some(&new_only));

        assert_eq!(totals.total_count, 2);
        assert_eq!(totals.actioned_count, 0);
        assert_eq!(totals.actioned_savings, Decimal::ZERO);

        let with_actioned: StatusFilter = [Status::New, Status::Actioned].into_iter().collect();
        assert_eq!(dataset.totals(Some(&with_actioned)).actioned_count, 2);
    }

    #[test]
    fn filter_matching_nothing_returns_zeroed_totals() {
        let snoozed: StatusFilter = [Status::Snoozed].into_iter().collect();
        assert_eq!(fixture().totals(Some(&snoozed)), Totals::default());
        assert_eq!(fixture().high_priority_count("Idle Resources", Some(&snoozed)), 0);
        assert_eq!(fixture().high_priority_count("Unknown", None), 0);
    }

    #[test]
    fn category_savings_add_up_to_total() {
        let dataset = generate().expect("generate");
        let filters = [
            None,
            Some([Status::Actioned].into_iter().collect::<StatusFilter>()),
            Some([Status::New, Status::Viewed, Status::ReVisit].into_iter().collect()),
        ];
        for filter in &filters {
            let totals = dataset.totals(filter.as_ref());
            let summed: Decimal = totals.category_savings.values().copied().sum();
            assert_eq!(summed, totals.total_savings);
        }
    }

    #[test]
    fn widening_a_filter_never_reduces_the_count() {
        let dataset = generate().expect("generate");
        for a in Status::ALL {
            for b in Status::ALL {
                let filter_a: StatusFilter = [a].into_iter().collect();
                let filter_b: StatusFilter = [b].into_iter().collect();
                let union = filter_a.union(&filter_b);
                assert!(
                    dataset.totals(Some(&filter_a)).total_count
                        <= dataset.totals(Some(&union)).total_count
                );
            }
        }
    }

    #[test]
    fn repeated_aggregation_is_bit_identical() {
        let dataset = generate().expect("generate");
        let first = dataset.totals(None);
        for _ in 0..5 {
            assert_eq!(dataset.totals(None), first);
        }
        assert_eq!(dataset.unfiltered_totals(), UnfilteredTotals::from(first));
    }

    #[test]
    fn priority_index_mirrors_stored_priority() {
        let dataset = generate().expect("generate");
        let index = dataset.priority_map();

        assert_eq!(index.len(), dataset.len());
        for record in dataset.records() {
            assert_eq!(index.get(record.id), Some(record.priority));
        }
    }

    #[test]
    fn high_priority_count_is_order_independent() {
        let dataset = generate().expect("generate");
        let expected = dataset
            .records()
            .iter()
            .filter(|record| record.category == "Reserved Instances")
            .filter(|record| dataset.priority_map().get(record.id) == Some(Priority::High))
            .count();
        assert_eq!(dataset.high_priority_count("Reserved Instances", None), expected);

        let mut reversed = dataset.records().to_vec();
        reversed.reverse();
        let reversed = small_dataset(reversed);
        assert_eq!(reversed.high_priority_count("Reserved Instances", None), expected);
    }

    #[test]
    fn overlay_changes_effective_status_without_touching_dataset() {
        let dataset = fixture();
        let mut overlay = StatusOverlay::new();
        overlay.apply(&dataset, RecommendationId(1), StatusEvent::Action).expect("new -> actioned");

        let plain = dataset.totals(None);
        let overlaid = Aggregator::with_overlay(&dataset, &overlay).totals(None);

        assert_eq!(plain.actioned_count, 2);
        assert_eq!(overlaid.actioned_count, 3);
        assert_eq!(overlaid.actioned_savings, Decimal::from(12_900));
        assert_eq!(dataset.records()[0].status, Status::New);

        let counts = dataset.aggregate_with(&overlay).count_by_status();
        assert_eq!(counts.get(&Status::Actioned), Some(&3));
        assert_eq!(counts.get(&Status::New), Some(&1));
    }
}
