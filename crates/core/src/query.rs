//! Dashboard-style listing: filter, sort, group and paginate recommendations.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregation::StatusFilter;
use crate::dataset::Dataset;
use crate::domain::recommendation::{Ease, Priority, Recommendation, RecommendationRow, Status};
use crate::overlay::StatusOverlay;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page numbers start at 1")]
    ZeroPage,
    #[error("per_page must be greater than zero")]
    ZeroPageSize,
    #[error("unknown sort key `{0}`")]
    UnknownSortKey(String),
    #[error("unknown grouping `{0}`")]
    UnknownGroupBy(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Savings,
    Created,
    #[default]
    Id,
    Category,
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "savings" => Ok(Self::Savings),
            "created" | "created_at" => Ok(Self::Created),
            "id" => Ok(Self::Id),
            "category" => Ok(Self::Category),
            other => Err(QueryError::UnknownSortKey(other.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Category,
    Provider,
    Owner,
    Status,
    Priority,
}

impl FromStr for GroupBy {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "provider" => Ok(Self::Provider),
            "owner" => Ok(Self::Owner),
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            other => Err(QueryError::UnknownGroupBy(other.to_owned())),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Category => "category",
            Self::Provider => "provider",
            Self::Owner => "owner",
            Self::Status => "status",
            Self::Priority => "priority",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::ZeroPage);
        }
        if per_page == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        Ok(Self { page, per_page })
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    pub count: usize,
    pub savings: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryPage {
    pub total_matches: usize,
    pub page: Option<Pagination>,
    pub rows: Vec<RecommendationRow>,
}

/// Filter dimensions are ANDed; values within one dimension are ORed. An empty
/// dimension does not constrain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecommendationQuery {
    pub categories: BTreeSet<String>,
    pub statuses: StatusFilter,
    pub priorities: BTreeSet<Priority>,
    pub providers: BTreeSet<String>,
    pub owners: BTreeSet<String>,
    pub ease: BTreeSet<Ease>,
    pub search: Option<String>,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub pagination: Option<Pagination>,
}

impl RecommendationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priorities.insert(priority);
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.providers.insert(provider.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owners.insert(owner.into());
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease.insert(ease);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = (!text.trim().is_empty()).then_some(text);
        self
    }

    pub fn sort_by(mut self, sort: SortKey, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    fn matches(&self, record: &Recommendation, status: Status) -> bool {
        let named = |set: &BTreeSet<String>, value: &str| set.is_empty() || set.contains(value);

        self.statuses.matches(status)
            && named(&self.categories, &record.category)
            && named(&self.providers, &record.provider)
            && named(&self.owners, &record.owner)
            && (self.priorities.is_empty() || self.priorities.contains(&record.priority))
            && (self.ease.is_empty() || self.ease.contains(&record.ease_to_implement))
            && self.search.as_deref().map_or(true, |needle| text_matches(record, needle))
    }

    fn selected<'a>(
        &'a self,
        dataset: &'a Dataset,
        overlay: Option<&'a StatusOverlay>,
    ) -> impl Iterator<Item = (&'a Recommendation, Status)> + 'a {
        dataset
            .records()
            .iter()
            .map(move |record| {
                (record, overlay.map_or(record.status, |overlay| overlay.effective_status(record)))
            })
            .filter(move |(record, status)| self.matches(record, *status))
    }

    pub fn count(&self, dataset: &Dataset, overlay: Option<&StatusOverlay>) -> usize {
        self.selected(dataset, overlay).count()
    }

    /// Matching rows in sort order, cut to the requested page. Rows carry the
    /// effective status.
    pub fn run(&self, dataset: &Dataset, overlay: Option<&StatusOverlay>) -> QueryPage {
        let mut matched: Vec<(&Recommendation, Status)> = self.selected(dataset, overlay).collect();
        matched.sort_by(|(left, _), (right, _)| {
            let ordering = compare(self.sort, left, right);
            let ordering = match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            ordering.then_with(|| left.id.cmp(&right.id))
        });

        let total_matches = matched.len();
        let rows = match self.pagination {
            Some(page) => matched
                .into_iter()
                .skip(page.offset())
                .take(page.per_page)
                .map(|(record, status)| RecommendationRow::from_record(record, status))
                .collect(),
            None => matched
                .into_iter()
                .map(|(record, status)| RecommendationRow::from_record(record, status))
                .collect(),
        };

        QueryPage { total_matches, page: self.pagination, rows }
    }

    /// Counts and savings per group over the matching records, ordered by key.
    pub fn group(
        &self,
        dataset: &Dataset,
        overlay: Option<&StatusOverlay>,
        group_by: GroupBy,
    ) -> Vec<Group> {
        let mut groups: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
        for (record, status) in self.selected(dataset, overlay) {
            let key = match group_by {
                GroupBy::Category => record.category.clone(),
                GroupBy::Provider => record.provider.clone(),
                GroupBy::Owner => record.owner.clone(),
                GroupBy::Status => status.to_string(),
                GroupBy::Priority => record.priority.as_str().to_owned(),
            };
            let entry = groups.entry(key).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += record.savings;
        }

        groups.into_iter().map(|(key, (count, savings))| Group { key, count, savings }).collect()
    }
}

fn compare(sort: SortKey, left: &Recommendation, right: &Recommendation) -> Ordering {
    match sort {
        SortKey::Savings => left.savings.cmp(&right.savings),
        SortKey::Created => left.created_at.cmp(&right.created_at),
        SortKey::Id => left.id.cmp(&right.id),
        SortKey::Category => left.category.cmp(&right.category),
    }
}

fn text_matches(record: &Recommendation, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    record.title.to_lowercase().contains(&needle)
        || record.description.to_lowercase().contains(&needle)
        || record.ticket_reference().is_some_and(|ticket| ticket.to_lowercase().contains(&needle))
}
