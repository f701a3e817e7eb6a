use clap::Args;
use costdeck_core::config::AppConfig;
use costdeck_core::errors::ApplicationError;
use costdeck_core::{
    Ease, GroupBy, Pagination, Priority, RecommendationQuery, SortDirection, SortKey,
};
use serde_json::json;

use super::{load_dataset, parse_statuses, CommandResult};

/// Raw list filters as they arrive from the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long = "category", help = "Restrict to a category (repeatable)")]
    pub categories: Vec<String>,
    #[arg(long = "status", help = "Restrict to a status (repeatable)")]
    pub statuses: Vec<String>,
    #[arg(long = "priority", help = "Restrict to a priority: high|medium|low (repeatable)")]
    pub priorities: Vec<String>,
    #[arg(long = "provider", help = "Restrict to a provider (repeatable)")]
    pub providers: Vec<String>,
    #[arg(long = "owner", help = "Restrict to an owner (repeatable)")]
    pub owners: Vec<String>,
    #[arg(long = "ease", help = "Restrict to an ease: easy|medium|hard (repeatable)")]
    pub ease: Vec<String>,
    #[arg(long, help = "Case-insensitive text in title, description or ticket reference")]
    pub search: Option<String>,
    #[arg(long, help = "Sort key: savings|created|id|category")]
    pub sort: Option<String>,
    #[arg(long, help = "Sort in descending order")]
    pub descending: bool,
    #[arg(long, help = "1-based page number")]
    pub page: Option<usize>,
    #[arg(long, help = "Rows per page (default 25 when paginating)")]
    pub per_page: Option<usize>,
    #[arg(long, help = "Group instead of listing: category|provider|owner|status|priority")]
    pub group_by: Option<String>,
}

const DEFAULT_PER_PAGE: usize = 25;

pub fn run(config: &AppConfig, args: &ListArgs) -> CommandResult {
    let (query, group_by) = match build_query(args) {
        Ok(parsed) => parsed,
        Err(error) => return CommandResult::from_error("list", &error),
    };
    let dataset = match load_dataset(config) {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error("list", &error),
    };

    if let Some(group_by) = group_by {
        let groups = query.group(&dataset, None, group_by);
        return CommandResult::success_with_data(
            "list",
            format!("{} groups by {group_by}", groups.len()),
            json!({ "group_by": group_by, "groups": groups }),
        );
    }

    let page = query.run(&dataset, None);
    CommandResult::success_with_data(
        "list",
        format!("{} of {} matching recommendations", page.rows.len(), page.total_matches),
        page,
    )
}

fn build_query(
    args: &ListArgs,
) -> Result<(RecommendationQuery, Option<GroupBy>), ApplicationError> {
    let mut query = RecommendationQuery::new();
    query.statuses = parse_statuses(&args.statuses)?;
    query.categories = args.categories.iter().cloned().collect();
    query.providers = args.providers.iter().cloned().collect();
    query.owners = args.owners.iter().cloned().collect();
    query.priorities = args
        .priorities
        .iter()
        .map(|value| value.parse::<Priority>().map_err(ApplicationError::InvalidInput))
        .collect::<Result<_, _>>()?;
    query.ease = args
        .ease
        .iter()
        .map(|value| value.parse::<Ease>().map_err(ApplicationError::InvalidInput))
        .collect::<Result<_, _>>()?;
    if let Some(search) = &args.search {
        query = query.search(search.clone());
    }

    let sort = args.sort.as_deref().map(str::parse::<SortKey>).transpose()?.unwrap_or_default();
    let direction =
        if args.descending { SortDirection::Descending } else { SortDirection::Ascending };
    query = query.sort_by(sort, direction);

    if args.page.is_some() || args.per_page.is_some() {
        let pagination = Pagination::new(
            args.page.unwrap_or(1),
            args.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )?;
        query = query.paginate(pagination);
    }

    let group_by = args.group_by.as_deref().map(str::parse::<GroupBy>).transpose()?;
    Ok((query, group_by))
}

#[cfg(test)]
mod tests {
    use costdeck_core::{Priority, QueryError, SortDirection, SortKey, Status};

    use super::{build_query, ListArgs};
    use costdeck_core::errors::ApplicationError;

    #[test]
    fn flags_translate_into_query_dimensions() {
        let args = ListArgs {
            statuses: vec!["new".into(), "marked_for_review".into()],
            priorities: vec!["high".into()],
            sort: Some("savings".into()),
            descending: true,
            per_page: Some(10),
            ..ListArgs::default()
        };

        let (query, group_by) = build_query(&args).expect("valid args");
        assert!(group_by.is_none());
        assert!(query.statuses.contains(Status::New));
        assert!(query.statuses.contains(Status::MarkedForReview));
        assert!(query.priorities.contains(&Priority::High));
        assert_eq!((query.sort, query.direction), (SortKey::Savings, SortDirection::Descending));
        assert_eq!(query.pagination.map(|page| (page.page, page.per_page)), Some((1, 10)));
    }

    #[test]
    fn bad_values_are_reported_as_invalid_input() {
        let zero_page = ListArgs { page: Some(0), ..ListArgs::default() };
        assert!(matches!(
            build_query(&zero_page),
            Err(ApplicationError::Query(QueryError::ZeroPage))
        ));

        let bad_status = ListArgs { statuses: vec!["pending".into()], ..ListArgs::default() };
        let error = build_query(&bad_status).err().expect("unknown status");
        assert_eq!(error.exit_code(), 4);
    }
}
