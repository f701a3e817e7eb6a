use costdeck_core::config::AppConfig;
use serde::Serialize;

use super::{load_dataset, parse_statuses, CommandResult};

#[derive(Debug, Serialize)]
struct PriorityCount {
    category: String,
    known_category: bool,
    high_priority: usize,
}

pub fn run(config: &AppConfig, category: &str, statuses: &[String]) -> CommandResult {
    let filter = match parse_statuses(statuses) {
        Ok(filter) => filter,
        Err(error) => return CommandResult::from_error("priority-count", &error),
    };
    let dataset = match load_dataset(config) {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error("priority-count", &error),
    };

    let known_category = dataset.kind().taxonomy().category(category).is_some();
    if !known_category {
        tracing::warn!(
            event_name = "cli.unknown_category",
            category,
            dataset = %dataset.kind(),
            "category is not part of this dataset; count will be zero"
        );
    }

    let report = PriorityCount {
        category: category.to_owned(),
        known_category,
        high_priority: dataset.high_priority_count(category, Some(&filter)),
    };
    CommandResult::success_with_data(
        "priority-count",
        format!("{} high-priority recommendations in {category}", report.high_priority),
        report,
    )
}
