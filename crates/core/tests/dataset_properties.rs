use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;

use costdeck_core::dataset::StatusPool;
use costdeck_core::{
    generate, generate_with, Dataset, DatasetKind, GenerationOptions, Priority,
    RecommendationQuery, Status, StatusFilter,
};

fn both_datasets() -> Vec<Dataset> {
    [DatasetKind::Cloud, DatasetKind::Saas]
        .into_iter()
        .map(|kind| generate_with(kind, GenerationOptions::default()).expect("generate"))
        .collect()
}

#[test]
fn same_seed_and_reference_time_give_identical_datasets() {
    let first = generate().expect("first run");
    let second = generate().expect("second run");

    assert_eq!(first.records(), second.records());
    assert_eq!(first.summary(), second.summary());
}

#[test]
fn different_seeds_diverge() {
    let base = generate().expect("generate");
    let other = generate_with(
        DatasetKind::Cloud,
        GenerationOptions { seed: base.seed().wrapping_add(1), ..GenerationOptions::default() },
    )
    .expect("generate");

    assert_ne!(base.records(), other.records());
}

#[test]
fn ids_are_dense_from_one() {
    for dataset in both_datasets() {
        for (position, record) in dataset.records().iter().enumerate() {
            assert_eq!(record.id.0 as usize, position + 1);
        }
        assert_eq!(dataset.len(), dataset.summary().total_planned());
    }
}

#[test]
fn status_specific_fields_follow_status() {
    for dataset in both_datasets() {
        let now = dataset.reference_time();
        for record in dataset.records() {
            let status = record.status;
            assert_eq!(
                record.archive_note().is_some(),
                status == Status::Archived,
                "{}",
                record.id
            );
            assert_eq!(
                record.review_note().is_some(),
                matches!(status, Status::MarkedForReview | Status::Snoozed),
                "{}",
                record.id
            );
            assert_eq!(record.snoozed_until().is_some(), status == Status::Snoozed);
            assert_eq!(record.actioned_date().is_some(), status == Status::Actioned);
            if status == Status::Archived {
                let until = record.archived_until().expect("archived records keep a window");
                assert!(until > now, "archive window of {} should be in the future", record.id);
            } else {
                assert!(record.archived_until().is_none());
            }
            if let Some(at) = record.actioned_date() {
                assert!(at > record.created_at);
                assert!(at <= now);
            }
        }
    }
}

#[test]
fn actioned_quotas_are_met_per_category() {
    for dataset in both_datasets() {
        for (category, quota) in dataset.kind().taxonomy().actioned_quotas {
            assert_eq!(dataset.summary().quota_actioned.get(*category), Some(quota));
            let actioned_medium = dataset
                .records()
                .iter()
                .filter(|record| record.category == *category)
                .filter(|record| record.priority == Priority::Medium)
                .filter(|record| record.status == Status::Actioned)
                .count();
            assert!(actioned_medium >= *quota, "{category}: {actioned_medium} < {quota}");
        }
    }
}

#[test]
fn exactly_ten_extra_snoozed_records_exist() {
    for dataset in both_datasets() {
        let extras: usize = dataset
            .summary()
            .populations
            .iter()
            .filter(|population| population.pool == StatusPool::SnoozedExtra)
            .map(|population| population.count)
            .sum();
        assert_eq!(extras, 10);
    }
}

#[test]
fn savings_fall_in_the_band_for_class_and_priority() {
    for dataset in both_datasets() {
        let taxonomy = dataset.kind().taxonomy();
        for record in dataset.records() {
            let (min, max) = taxonomy.value_class(&record.category).savings_range(record.priority);
            let savings = record.savings.to_u64().expect("whole non-negative amount");
            assert!((min..=max).contains(&savings), "{} outside {min}..={max}", record.savings);
            assert_eq!(record.savings_formatted, costdeck_core::format_savings(record.savings));
        }
    }
}

#[test]
fn totals_agree_with_query_counts() {
    let dataset = generate().expect("generate");
    for status in Status::ALL {
        let filter: StatusFilter = [status].into_iter().collect();
        let totals = dataset.totals(Some(&filter));
        let matched = RecommendationQuery::new().status(status).count(&dataset, None);
        assert_eq!(totals.total_count, matched, "{status}");
    }
}

#[test]
fn high_priority_counts_match_planned_populations() {
    let dataset = generate().expect("generate");
    for category in dataset.kind().taxonomy().category_names() {
        assert_eq!(
            dataset.high_priority_count(category, None),
            dataset.summary().planned_count(category, Priority::High)
        );
    }
}

fn counts_by_category_and_priority(dataset: &Dataset, category: &str) -> [usize; 3] {
    let count = |priority: Priority| {
        dataset
            .records()
            .iter()
            .filter(|record| record.category == category && record.priority == priority)
            .count()
    };
    [count(Priority::High), count(Priority::Medium), count(Priority::Low)]
}

fn assert_golden(
    kind: DatasetKind,
    len: usize,
    per_category: &[(&str, [usize; 3])],
    statuses: &[(Status, usize)],
) {
    let dataset = generate_with(kind, GenerationOptions::default()).expect("generate");

    assert_eq!(dataset.len(), len, "{kind} record count");
    for (category, expected) in per_category {
        assert_eq!(
            counts_by_category_and_priority(&dataset, category),
            *expected,
            "{kind} {category} high/medium/low"
        );
    }
    let expected: BTreeMap<Status, usize> = statuses.iter().copied().collect();
    assert_eq!(dataset.aggregate().count_by_status(), expected, "{kind} status tally");
}

#[test]
fn default_cloud_dataset_has_fixed_counts() {
    assert_golden(
        DatasetKind::Cloud,
        425,
        &[
            ("Reserved Instances", [6, 35, 16]),
            ("Rightsizing", [7, 31, 14]),
            ("Savings Plans", [6, 32, 14]),
            ("Storage Optimization", [7, 31, 16]),
            ("Idle Resources", [5, 35, 16]),
            ("Spot Instances", [6, 28, 15]),
            ("Data Transfer", [5, 31, 14]),
            ("Licensing", [5, 34, 16]),
        ],
        &[
            (Status::New, 142),
            (Status::Viewed, 79),
            (Status::ReVisit, 17),
            (Status::Archived, 7),
            (Status::Actioned, 111),
            (Status::Snoozed, 25),
            (Status::MarkedForReview, 44),
        ],
    );
}

#[test]
fn default_saas_dataset_has_fixed_counts() {
    assert_golden(
        DatasetKind::Saas,
        217,
        &[
            ("Unused Licenses", [6, 35, 16]),
            ("Plan Downgrades", [7, 31, 14]),
            ("Duplicate Subscriptions", [7, 33, 14]),
            ("Renewal Negotiation", [6, 31, 17]),
        ],
        &[
            (Status::New, 81),
            (Status::Viewed, 37),
            (Status::ReVisit, 11),
            (Status::Archived, 2),
            (Status::Actioned, 36),
            (Status::Snoozed, 15),
            (Status::MarkedForReview, 35),
        ],
    );
}

#[test]
fn elapsed_archive_windows_are_demoted_during_generation() {
    let dataset = generate_with(
        DatasetKind::Cloud,
        GenerationOptions { seed: 21, ..GenerationOptions::default() },
    )
    .expect("generate");
    let now = dataset.reference_time();

    assert_eq!(dataset.summary().archives_expired, 5);
    assert_eq!(dataset.summary().archive_windows_assigned, 16);
    let archived: Vec<_> =
        dataset.records().iter().filter(|record| record.status == Status::Archived).collect();
    assert_eq!(archived.len(), 11);
    for record in archived {
        let until = record.archived_until().expect("archive window");
        assert!(until > now, "record {} kept an elapsed archive window", record.id);
    }
    let revisits =
        dataset.records().iter().filter(|record| record.status == Status::ReVisit).count();
    assert_eq!(revisits, 22);
}
