use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationId(pub u32);

impl fmt::Display for RecommendationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Viewed")]
    Viewed,
    #[serde(rename = "Re-visit")]
    ReVisit,
    #[serde(rename = "Archived")]
    Archived,
    #[serde(rename = "Actioned")]
    Actioned,
    #[serde(rename = "Snoozed")]
    Snoozed,
    #[serde(rename = "Marked for review")]
    MarkedForReview,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::New,
        Status::Viewed,
        Status::ReVisit,
        Status::Archived,
        Status::Actioned,
        Status::Snoozed,
        Status::MarkedForReview,
    ];

    /// Statuses handed out by the main per-category generation loop.
    pub const PRIMARY: [Status; 3] = [Status::New, Status::Viewed, Status::MarkedForReview];

    /// Statuses handed out to the smaller supplementary population per category.
    pub const SECONDARY: [Status; 4] =
        [Status::ReVisit, Status::Archived, Status::Actioned, Status::Snoozed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Viewed => "Viewed",
            Self::ReVisit => "Re-visit",
            Self::Archived => "Archived",
            Self::Actioned => "Actioned",
            Self::Snoozed => "Snoozed",
            Self::MarkedForReview => "Marked for review",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "new" => Ok(Self::New),
            "viewed" => Ok(Self::Viewed),
            "re visit" | "revisit" => Ok(Self::ReVisit),
            "archived" => Ok(Self::Archived),
            "actioned" => Ok(Self::Actioned),
            "snoozed" => Ok(Self::Snoozed),
            "marked for review" | "review" => Ok(Self::MarkedForReview),
            _ => Err(format!("unknown status `{value}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Savings-threshold classifier: high at 2000 and above, medium at 1000 and above.
    ///
    /// Not consulted anywhere in generation or aggregation. The priority stored on a
    /// [`Recommendation`] is assigned at generation time and stays authoritative, so
    /// the two notions can disagree for the same record.
    pub fn from_savings(savings: Decimal) -> Self {
        if savings >= Decimal::from(2_000) {
            Self::High
        } else if savings >= Decimal::from(1_000) {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority `{other}` (expected high|medium|low)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ease {
    Easy,
    Medium,
    Hard,
}

impl Ease {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl std::str::FromStr for Ease {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown ease `{other}` (expected easy|medium|hard)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsPeriod {
    #[serde(rename = "monthly saving")]
    Monthly,
    #[serde(rename = "annual saving")]
    Annual,
}

impl SavingsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly saving",
            Self::Annual => "annual saving",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note: String,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
}

/// Status-specific payload carried by a recommendation.
///
/// Each variant belongs to exactly one [`Status`]; see [`Annotation::status`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Review { note: Note },
    Snooze { note: Option<Note>, until: Option<DateTime<Utc>> },
    Archive { note: Note, until: Option<DateTime<Utc>> },
    Actioned { at: DateTime<Utc> },
}

impl Annotation {
    pub fn status(&self) -> Status {
        match self {
            Self::Review { .. } => Status::MarkedForReview,
            Self::Snooze { .. } => Status::Snoozed,
            Self::Archive { .. } => Status::Archived,
            Self::Actioned { .. } => Status::Actioned,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub title: String,
    pub description: String,
    pub savings: Decimal,
    pub savings_formatted: String,
    pub period: SavingsPeriod,
    pub provider: String,
    pub status: Status,
    pub owner: String,
    pub priority: Priority,
    pub category: String,
    pub sub_category: Option<String>,
    pub tag_type: String,
    pub tag_value: String,
    pub ease_to_implement: Ease,
    pub created_at: DateTime<Utc>,
    pub created_date: String,
    pub annotation: Option<Annotation>,
}

impl Recommendation {
    pub fn archive_note(&self) -> Option<&Note> {
        match &self.annotation {
            Some(Annotation::Archive { note, .. }) => Some(note),
            _ => None,
        }
    }

    /// Review note for `Marked for review` records, snooze rationale for `Snoozed` ones.
    pub fn review_note(&self) -> Option<&Note> {
        match &self.annotation {
            Some(Annotation::Review { note }) => Some(note),
            Some(Annotation::Snooze { note, .. }) => note.as_ref(),
            _ => None,
        }
    }

    pub fn snoozed_until(&self) -> Option<DateTime<Utc>> {
        match &self.annotation {
            Some(Annotation::Snooze { until, .. }) => *until,
            _ => None,
        }
    }

    pub fn archived_until(&self) -> Option<DateTime<Utc>> {
        match &self.annotation {
            Some(Annotation::Archive { until, .. }) => *until,
            _ => None,
        }
    }

    pub fn actioned_date(&self) -> Option<DateTime<Utc>> {
        match &self.annotation {
            Some(Annotation::Actioned { at }) => Some(*at),
            _ => None,
        }
    }

    /// Ticket reference (`SR` followed by six digits) embedded in the description, if any.
    pub fn ticket_reference(&self) -> Option<&str> {
        let bytes = self.description.as_bytes();
        self.description.match_indices("SR").find_map(|(start, _)| {
            let digits = bytes.get(start + 2..start + 8)?;
            let bounded = bytes.get(start + 8).map(|next| !next.is_ascii_digit()).unwrap_or(true);
            (digits.iter().all(u8::is_ascii_digit) && bounded)
                .then(|| &self.description[start..start + 8])
        })
    }

    pub fn to_row(&self) -> RecommendationRow {
        RecommendationRow::from_record(self, self.status)
    }
}

/// Flat, camelCase projection of a [`Recommendation`] as consumed by dashboard callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRow {
    pub id: RecommendationId,
    pub title: String,
    pub description: String,
    pub savings: Decimal,
    pub savings_formatted: String,
    pub period: SavingsPeriod,
    pub provider: String,
    pub status: Status,
    pub owner: String,
    pub priority: Priority,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    pub tag_type: String,
    pub tag_value: String,
    pub ease_to_implement: Ease,
    pub created_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actioned_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_note: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_until: Option<DateTime<Utc>>,
}

impl RecommendationRow {
    /// Builds a row reporting `status` in place of the stored one. The stored annotation
    /// only shows through while `status` matches the stored status.
    pub fn from_record(record: &Recommendation, status: Status) -> Self {
        let stored = status == record.status;
        Self {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            savings: record.savings,
            savings_formatted: record.savings_formatted.clone(),
            period: record.period,
            provider: record.provider.clone(),
            status,
            owner: record.owner.clone(),
            priority: record.priority,
            category: record.category.clone(),
            sub_category: record.sub_category.clone(),
            tag_type: record.tag_type.clone(),
            tag_value: record.tag_value.clone(),
            ease_to_implement: record.ease_to_implement,
            created_date: record.created_date.clone(),
            actioned_date: record.actioned_date().filter(|_| stored),
            archive_note: record.archive_note().filter(|_| stored).cloned(),
            review_note: record.review_note().filter(|_| stored).cloned(),
            snoozed_until: record.snoozed_until().filter(|_| stored),
            archived_until: record.archived_until().filter(|_| stored),
        }
    }
}

/// Renders a whole-unit amount as `$12,345`.
pub fn format_savings(amount: Decimal) -> String {
    let whole = amount.trunc().abs().to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.trunc().is_zero() { "-" } else { "" };
    format!("{sign}{CURRENCY_SYMBOL}{grouped}")
}

pub const CURRENCY_SYMBOL: &str = "$";
