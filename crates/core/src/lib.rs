pub mod aggregation;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod errors;
pub mod generator;
pub mod lifecycle;
pub mod overlay;
pub mod query;
pub mod taxonomy;

pub use aggregation::{Aggregator, StatusFilter, Totals, UnfilteredTotals};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, ReferenceTime};
pub use dataset::{Dataset, GenerationSummary, PriorityIndex};
pub use domain::recommendation::{
    format_savings, Annotation, Ease, Note, Priority, Recommendation, RecommendationId,
    RecommendationRow, SavingsPeriod, Status,
};
pub use errors::{ApplicationError, DomainError};
pub use generator::{generate, generate_with, GenerationError, GenerationOptions, Generator};
pub use lifecycle::{LifecycleError, StatusEvent, TransitionOutcome};
pub use overlay::{BulkOutcome, OverlayError, StatusOverlay};
pub use query::{
    Group, GroupBy, Pagination, QueryError, QueryPage, RecommendationQuery, SortDirection, SortKey,
};
pub use taxonomy::{DatasetKind, Taxonomy, TaxonomyError, ValueClass};
