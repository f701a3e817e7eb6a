use costdeck_core::config::AppConfig;
use costdeck_core::{format_savings, Status, Totals, UnfilteredTotals};
use serde::Serialize;

use super::{load_dataset, parse_statuses, CommandResult};

#[derive(Debug, Serialize)]
struct TotalsReport {
    filter: Vec<Status>,
    filtered: Totals,
    unfiltered: UnfilteredTotals,
}

pub fn run(config: &AppConfig, statuses: &[String]) -> CommandResult {
    let filter = match parse_statuses(statuses) {
        Ok(filter) => filter,
        Err(error) => return CommandResult::from_error("totals", &error),
    };
    let dataset = match load_dataset(config) {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error("totals", &error),
    };

    let aggregator = dataset.aggregate();
    let report = TotalsReport {
        filter: filter.iter().collect(),
        filtered: aggregator.totals(Some(&filter)),
        unfiltered: aggregator.unfiltered_totals(),
    };

    let message = format!(
        "{} of {} recommendations selected, {} potential savings, {} actioned",
        report.filtered.total_count,
        report.unfiltered.total_count,
        format_savings(report.filtered.total_savings),
        format_savings(report.filtered.actioned_savings),
    );
    CommandResult::success_with_data("totals", message, report)
}
