use costdeck_core::config::AppConfig;
use costdeck_core::{GenerationSummary, RecommendationRow};
use serde::Serialize;

use super::{load_dataset, CommandResult};

#[derive(Debug, Serialize)]
struct GeneratedDataset<'a> {
    dataset: String,
    seed: u64,
    reference_time: String,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a GenerationSummary>,
    rows: Vec<RecommendationRow>,
}

pub fn run(config: &AppConfig, include_summary: bool) -> CommandResult {
    let dataset = match load_dataset(config) {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error("generate", &error),
    };

    let payload = GeneratedDataset {
        dataset: dataset.kind().to_string(),
        seed: dataset.seed(),
        reference_time: dataset.reference_time().to_rfc3339(),
        count: dataset.len(),
        summary: include_summary.then(|| dataset.summary()),
        rows: dataset.rows(),
    };

    CommandResult::success_with_data(
        "generate",
        format!("generated {} {} recommendations", payload.count, payload.dataset),
        payload,
    )
}
