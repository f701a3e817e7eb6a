//! Fixed tables that drive record generation: categories, providers, owners, tags,
//! value classification, actioned quotas and the snooze category subset.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::recommendation::Priority;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Cloud,
    Saas,
}

impl DatasetKind {
    pub fn taxonomy(&self) -> &'static Taxonomy {
        match self {
            Self::Cloud => &CLOUD,
            Self::Saas => &SAAS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Saas => "saas",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cloud" => Ok(Self::Cloud),
            "saas" => Ok(Self::Saas),
            other => Err(format!("unsupported dataset `{other}` (expected cloud|saas)")),
        }
    }
}

/// Savings band a category falls into. Controls the amount ranges used at generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueClass {
    High,
    Medium,
    Low,
}

impl ValueClass {
    /// Inclusive whole-unit savings range for a priority tier within this band.
    pub fn savings_range(&self, priority: Priority) -> (u64, u64) {
        match (self, priority) {
            (Self::High, Priority::High) => (5_000, 15_000),
            (Self::High, Priority::Medium) => (2_000, 5_000),
            (Self::High, Priority::Low) => (500, 2_000),
            (Self::Medium, Priority::High) => (2_000, 8_000),
            (Self::Medium, Priority::Medium) => (800, 2_500),
            (Self::Medium, Priority::Low) => (200, 800),
            (Self::Low, Priority::High) => (1_000, 3_000),
            (Self::Low, Priority::Medium) => (300, 1_000),
            (Self::Low, Priority::Low) => (50, 300),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: &'static str,
    pub sub_categories: &'static [&'static str],
    pub titles: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagSpec {
    pub tag_type: &'static str,
    pub values: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Taxonomy {
    pub kind: DatasetKind,
    pub categories: &'static [CategorySpec],
    pub providers: &'static [&'static str],
    pub owners: &'static [&'static str],
    pub tags: &'static [TagSpec],
    pub high_value: &'static [&'static str],
    pub low_value: &'static [&'static str],
    pub actioned_quotas: &'static [(&'static str, usize)],
    pub snooze_categories: &'static [&'static str],
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("taxonomy `{kind}` declares no {table}")]
    EmptyTable { kind: DatasetKind, table: &'static str },
    #[error("taxonomy `{kind}` declares category `{category}` more than once")]
    DuplicateCategory { kind: DatasetKind, category: &'static str },
    #[error("taxonomy `{kind}` category `{category}` has no titles")]
    CategoryWithoutTitles { kind: DatasetKind, category: &'static str },
    #[error("taxonomy `{kind}` tag `{tag_type}` has no values")]
    TagWithoutValues { kind: DatasetKind, tag_type: &'static str },
    #[error("taxonomy `{kind}` {table} references unknown category `{category}`")]
    UnknownCategory { kind: DatasetKind, table: &'static str, category: &'static str },
    #[error("taxonomy `{kind}` classifies `{category}` as both high- and low-value")]
    ConflictingValueClass { kind: DatasetKind, category: &'static str },
}

impl Taxonomy {
    pub fn value_class(&self, category: &str) -> ValueClass {
        if self.high_value.contains(&category) {
            ValueClass::High
        } else if self.low_value.contains(&category) {
            ValueClass::Low
        } else {
            ValueClass::Medium
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategorySpec> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories.iter().map(|category| category.name)
    }

    /// Checks every cross-table reference. Generation refuses to start on failure.
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        let kind = self.kind;
        let non_empty = [
            ("categories", self.categories.is_empty()),
            ("providers", self.providers.is_empty()),
            ("owners", self.owners.is_empty()),
            ("tags", self.tags.is_empty()),
            ("snooze categories", self.snooze_categories.is_empty()),
        ];
        if let Some((table, _)) = non_empty.iter().find(|(_, empty)| *empty) {
            return Err(TaxonomyError::EmptyTable { kind, table: *table });
        }

        let mut seen = BTreeSet::new();
        for category in self.categories {
            if !seen.insert(category.name) {
                return Err(TaxonomyError::DuplicateCategory { kind, category: category.name });
            }
            if category.titles.is_empty() {
                return Err(TaxonomyError::CategoryWithoutTitles { kind, category: category.name });
            }
        }

        if let Some(tag) = self.tags.iter().find(|tag| tag.values.is_empty()) {
            return Err(TaxonomyError::TagWithoutValues { kind, tag_type: tag.tag_type });
        }

        let references = self
            .actioned_quotas
            .iter()
            .map(|(category, _)| ("actioned quota table", *category))
            .chain(self.snooze_categories.iter().map(|category| ("snooze subset", *category)))
            .chain(self.high_value.iter().map(|category| ("high-value set", *category)))
            .chain(self.low_value.iter().map(|category| ("low-value set", *category)));
        for (table, category) in references {
            if !seen.contains(category) {
                return Err(TaxonomyError::UnknownCategory { kind, table, category });
            }
        }

        if let Some(category) = self.high_value.iter().find(|name| self.low_value.contains(*name)) {
            return Err(TaxonomyError::ConflictingValueClass { kind, category: *category });
        }

        Ok(())
    }
}

const OWNERS: &[&str] =
    &["Priya Shah", "Marcus Chen", "Elena Rossi", "Tom Okafor", "Sara Lindqvist"];

pub static CLOUD: Taxonomy = Taxonomy {
    kind: DatasetKind::Cloud,
    categories: &[
        CategorySpec {
            name: "Reserved Instances",
            sub_categories: &["Compute", "Database", "Cache"],
            titles: &[
                "Purchase reserved capacity for steady-state workloads",
                "Convert on-demand fleet to reserved instances",
                "Renew expiring reservations at current utilisation",
            ],
        },
        CategorySpec {
            name: "Rightsizing",
            sub_categories: &["Compute", "Database", "Containers"],
            titles: &[
                "Downsize over-provisioned instances",
                "Move workload to a smaller instance family",
                "Reduce provisioned database capacity",
            ],
        },
        CategorySpec {
            name: "Savings Plans",
            sub_categories: &["Compute", "Machine Learning"],
            titles: &[
                "Commit to a one-year compute savings plan",
                "Extend savings plan coverage to new regions",
            ],
        },
        CategorySpec {
            name: "Storage Optimization",
            sub_categories: &["Object Storage", "Block Storage", "Snapshots"],
            titles: &[
                "Transition cold objects to archive tier",
                "Delete orphaned snapshots",
                "Switch volumes to a cheaper storage class",
            ],
        },
        CategorySpec {
            name: "Idle Resources",
            sub_categories: &["Load Balancers", "IP Addresses", "Volumes"],
            titles: &[
                "Remove idle load balancer",
                "Release unattached IP addresses",
                "Delete unattached volumes",
            ],
        },
        CategorySpec {
            name: "Spot Instances",
            sub_categories: &["Batch", "CI Runners"],
            titles: &[
                "Run batch jobs on spot capacity",
                "Move CI runners to interruptible instances",
            ],
        },
        CategorySpec {
            name: "Data Transfer",
            sub_categories: &["Cross-Region", "NAT Gateway", "CDN"],
            titles: &[
                "Reduce cross-region replication traffic",
                "Route egress through a VPC endpoint",
                "Cache static assets at the edge",
            ],
        },
        CategorySpec {
            name: "Licensing",
            sub_categories: &["BYOL", "Windows Server", "SQL Server"],
            titles: &[
                "Bring your own licence for SQL Server hosts",
                "Consolidate Windows Server licences",
            ],
        },
    ],
    providers: &["AWS", "Azure", "Google Cloud"],
    owners: OWNERS,
    tags: &[
        TagSpec { tag_type: "environment", values: &["production", "staging", "development"] },
        TagSpec { tag_type: "team", values: &["platform", "data", "payments", "growth"] },
        TagSpec { tag_type: "cost-center", values: &["CC-1001", "CC-2040", "CC-3150"] },
        TagSpec { tag_type: "application", values: &["checkout", "search", "analytics"] },
    ],
    high_value: &["Reserved Instances", "Savings Plans", "Rightsizing"],
    low_value: &["Idle Resources", "Data Transfer"],
    actioned_quotas: &[
        ("Reserved Instances", 20),
        ("Rightsizing", 20),
        ("Savings Plans", 20),
        ("Storage Optimization", 20),
        ("Idle Resources", 5),
        ("Spot Instances", 5),
        ("Data Transfer", 5),
        ("Licensing", 5),
    ],
    snooze_categories: &[
        "Reserved Instances",
        "Rightsizing",
        "Storage Optimization",
        "Idle Resources",
    ],
};

pub static SAAS: Taxonomy = Taxonomy {
    kind: DatasetKind::Saas,
    categories: &[
        CategorySpec {
            name: "Unused Licenses",
            sub_categories: &["Inactive Users", "Unassigned Seats"],
            titles: &[
                "Reclaim seats from inactive users",
                "Remove unassigned seats before renewal",
            ],
        },
        CategorySpec {
            name: "Plan Downgrades",
            sub_categories: &["Enterprise to Business", "Premium Add-ons"],
            titles: &[
                "Downgrade light users to the standard plan",
                "Drop unused premium add-ons",
            ],
        },
        CategorySpec {
            name: "Duplicate Subscriptions",
            sub_categories: &["Overlapping Tools", "Shadow IT"],
            titles: &[
                "Consolidate overlapping collaboration tools",
                "Cancel team-level duplicate subscriptions",
            ],
        },
        CategorySpec {
            name: "Renewal Negotiation",
            sub_categories: &["Multi-year Commit", "Volume Discount"],
            titles: &[
                "Negotiate a multi-year renewal discount",
                "Request volume pricing at renewal",
            ],
        },
    ],
    providers: &["Salesforce", "Slack", "Atlassian", "Microsoft 365", "Zoom"],
    owners: OWNERS,
    tags: &[
        TagSpec { tag_type: "department", values: &["engineering", "sales", "finance", "support"] },
        TagSpec { tag_type: "contract", values: &["annual", "monthly"] },
    ],
    high_value: &["Renewal Negotiation"],
    low_value: &["Duplicate Subscriptions"],
    actioned_quotas: &[
        ("Unused Licenses", 10),
        ("Plan Downgrades", 10),
        ("Duplicate Subscriptions", 5),
        ("Renewal Negotiation", 5),
    ],
    snooze_categories: &[
        "Unused Licenses",
        "Plan Downgrades",
        "Duplicate Subscriptions",
        "Renewal Negotiation",
    ],
};

#[cfg(test)]
mod tests {
    use super::{CategorySpec, DatasetKind, Taxonomy, TaxonomyError, ValueClass, CLOUD, SAAS};
    use crate::domain::recommendation::Priority;

    #[test]
    fn builtin_taxonomies_are_valid() {
        assert_eq!(CLOUD.validate(), Ok(()));
        assert_eq!(SAAS.validate(), Ok(()));
        assert_eq!(CLOUD.categories.len(), 8);
        assert_eq!(SAAS.categories.len(), 4);
        assert_eq!(CLOUD.providers.len(), 3);
        assert_eq!(CLOUD.owners.len(), 5);
    }

    #[test]
    fn cloud_quota_table_matches_category_split() {
        let twenty = CLOUD.actioned_quotas.iter().filter(|(_, quota)| *quota == 20).count();
        let five = CLOUD.actioned_quotas.iter().filter(|(_, quota)| *quota == 5).count();
        assert_eq!((twenty, five), (4, 4));
    }

    #[test]
    fn classifies_each_category_into_one_band() {
        assert_eq!(CLOUD.value_class("Reserved Instances"), ValueClass::High);
        assert_eq!(CLOUD.value_class("Data Transfer"), ValueClass::Low);
        assert_eq!(CLOUD.value_class("Licensing"), ValueClass::Medium);
        assert_eq!(CLOUD.value_class("Not A Category"), ValueClass::Medium);
    }

    #[test]
    fn savings_ranges_are_ordered_within_each_band() {
        for class in [ValueClass::High, ValueClass::Medium, ValueClass::Low] {
            for priority in Priority::ALL {
                let (min, max) = class.savings_range(priority);
                assert!(min <= max, "{class:?}/{priority:?} range is inverted");
            }
            assert!(class.savings_range(Priority::High).1 > class.savings_range(Priority::Low).1);
        }
    }

    #[test]
    fn quota_for_unknown_category_fails_fast() {
        let broken = Taxonomy { actioned_quotas: &[("Quantum Compute", 3)], ..CLOUD };
        assert_eq!(
            broken.validate(),
            Err(TaxonomyError::UnknownCategory {
                kind: DatasetKind::Cloud,
                table: "actioned quota table",
                category: "Quantum Compute",
            })
        );
    }

    #[test]
    fn category_without_titles_is_rejected() {
        static CATEGORIES: [CategorySpec; 1] =
            [CategorySpec { name: "Empty", sub_categories: &[], titles: &[] }];
        let broken = Taxonomy {
            categories: &CATEGORIES,
            high_value: &[],
            low_value: &[],
            actioned_quotas: &[],
            snooze_categories: &["Empty"],
            ..SAAS
        };
        assert!(matches!(
            broken.validate(),
            Err(TaxonomyError::CategoryWithoutTitles { category: "Empty", .. })
        ));
    }

    #[test]
    fn empty_snooze_subset_is_rejected() {
        let broken = Taxonomy { snooze_categories: &[], ..SAAS };
        assert!(matches!(
            broken.validate(),
            Err(TaxonomyError::EmptyTable { table: "snooze categories", .. })
        ));
    }

    #[test]
    fn dataset_kind_parses_case_insensitively() {
        assert_eq!("SaaS".parse::<DatasetKind>(), Ok(DatasetKind::Saas));
        assert_eq!(DatasetKind::Cloud.taxonomy().kind, DatasetKind::Cloud);
        assert!("onprem".parse::<DatasetKind>().is_err());
    }
}
