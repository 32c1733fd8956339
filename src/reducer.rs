//! Summary report reduction
//!
//! Both report tags share one pipeline: normalize the options, resolve the
//! workspace and grouping, fetch the summary report through the batch and
//! TTL caches, then reduce it either to a nested listing or to an hour total.

use crate::cache::{BatchCache, TtlCache};
use crate::credentials::resolve_workspace_id;
use crate::error::{escape_html, Result, TogglError};
use crate::gateway::TogglClient;
use crate::listings::{ClientDirectory, ListingRenderer};
use crate::options::{
    OptionValue, QueryOptions, ResolvedParams, SUMMARY_HOURS_PARAMS, SUMMARY_LISTING_PARAMS,
};
use crate::report::{Dimension, Filter, GroupingSelection, ReportGroup, ReportSubgroup, SummaryReport};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

const SUMMARY_OPERATION: &str = "summary";

/// Render the report as one `<li>` per group, in API order.
///
/// Each entry reads `label (Nh): sub, sub` where N is the group's duration
/// rounded to whole hours.
pub fn render_listing(
    report: &SummaryReport,
    selection: &GroupingSelection,
    clients: &ClientDirectory,
) -> String {
    let mut output = String::from("<ul>");
    for group in &report.groups {
        let label = group_label(group, selection.grouping, clients);
        let hours = (group.total_seconds() as f64 / 3600.0).round();
        let sub_labels: Vec<String> = group
            .sub_groups
            .iter()
            .map(|sub| subgroup_label(sub, selection.sub_grouping, clients))
            .filter(|label| !label.is_empty())
            .map(|label| escape_html(&label))
            .collect();

        output.push_str(&format!(
            "<li>{} ({}h): {}</li>",
            escape_html(&label),
            hours,
            sub_labels.join(", ")
        ));
    }
    output.push_str("</ul>");
    output
}

fn group_label(group: &ReportGroup, grouping: Option<Dimension>, clients: &ClientDirectory) -> String {
    let id = group.id.as_ref();
    match grouping {
        Some(Dimension::Clients) => id
            .and_then(|id| clients.name_of(id))
            .map(str::to_string)
            .or_else(|| group.title.client.clone())
            .or_else(|| id.map(ToString::to_string))
            .unwrap_or_default(),
        Some(Dimension::Users) => id.map(ToString::to_string).unwrap_or_default(),
        Some(Dimension::Projects)
        | Some(Dimension::Tasks)
        | Some(Dimension::TimeEntries)
        | None => format!(
            "{} - {}",
            group.title.project.as_deref().unwrap_or_default(),
            group.title.client.as_deref().unwrap_or_default()
        ),
    }
}

fn subgroup_label(sub: &ReportSubgroup, sub_grouping: Option<Dimension>, clients: &ClientDirectory) -> String {
    let title = sub.title.as_deref().map(str::trim).unwrap_or_default();
    match sub_grouping {
        Some(Dimension::Clients) => sub
            .id
            .as_ref()
            .and_then(|id| clients.name_of(id))
            .unwrap_or(title)
            .to_string(),
        Some(Dimension::Users) if title.is_empty() => {
            sub.id.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        Some(Dimension::Users)
        | Some(Dimension::Projects)
        | Some(Dimension::Tasks)
        | Some(Dimension::TimeEntries)
        | None => title.to_string(),
    }
}

/// Total hours over the matching groups and sub-groups, rounded to two
/// decimals. An empty report sums to zero.
pub fn sum_hours(report: &SummaryReport, filter: &Filter) -> f64 {
    let seconds: u64 = report
        .groups
        .iter()
        .filter(|group| filter.matches_group(group.id.as_ref()))
        .flat_map(|group| group.sub_groups.iter())
        .filter(|sub| filter.matches_subgroup(sub.id.as_ref()))
        .map(|sub| sub.seconds)
        .sum();
    round_hours(seconds)
}

fn round_hours(seconds: u64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Runs summary report queries for one render batch.
#[derive(Clone)]
pub struct ReportReducer {
    client: Arc<TogglClient>,
    responses: Arc<TtlCache>,
    batch: Arc<BatchCache>,
    listings: ListingRenderer,
    default_workspace: Option<String>,
}

struct PreparedQuery {
    options: QueryOptions,
    selection: GroupingSelection,
    workspace_id: String,
    params: ResolvedParams,
}

impl ReportReducer {
    pub fn new(
        client: Arc<TogglClient>,
        responses: Arc<TtlCache>,
        batch: Arc<BatchCache>,
        default_workspace: Option<String>,
    ) -> Self {
        let listings = ListingRenderer::new(
            Arc::clone(&client),
            Arc::clone(&responses),
            Arc::clone(&batch),
            default_workspace.clone(),
        );
        Self {
            client,
            responses,
            batch,
            listings,
            default_workspace,
        }
    }

    /// The report as a nested `<ul>` listing.
    pub async fn listing(&self, options: &QueryOptions) -> Result<String> {
        let query = self.prepare(options, SUMMARY_LISTING_PARAMS)?;
        let span = info_span!("summary_listing", batch = %self.batch.id(), workspace_id = %query.workspace_id);
        async {
            let report = self.summary(&query.workspace_id, &query.params).await?;
            let uses_clients = query.selection.grouping == Some(Dimension::Clients)
                || query.selection.sub_grouping == Some(Dimension::Clients);
            let clients = if uses_clients && !report.is_empty() {
                self.listings
                    .client_lookup(&query.workspace_id, &ResolvedParams::new())
                    .await
            } else {
                Arc::new(ClientDirectory::default())
            };
            Ok::<_, TogglError>(render_listing(&report, &query.selection, &clients))
        }
        .instrument(span)
        .await
    }

    /// The report summed to hours, optionally narrowed by `{grouping}_id`
    /// and `{sub_grouping}_id` options.
    pub async fn hours(&self, options: &QueryOptions) -> Result<f64> {
        let query = self.prepare(options, SUMMARY_HOURS_PARAMS)?;
        let span = info_span!("summary_hours", batch = %self.batch.id(), workspace_id = %query.workspace_id);
        async {
            let report = self.summary(&query.workspace_id, &query.params).await?;
            let filter = Filter::from_options(&query.selection, &query.options);
            debug!(?filter, groups = report.groups.len(), "Summing report hours");
            Ok::<_, TogglError>(sum_hours(&report, &filter))
        }
        .instrument(span)
        .await
    }

    fn prepare(&self, options: &QueryOptions, allowed: &[&str]) -> Result<PreparedQuery> {
        let mut options = options.clone();
        options.apply_aliases();
        let selection = GroupingSelection::resolve(&mut options);

        let workspace_id = resolve_workspace_id(&options, self.default_workspace.as_deref())?;
        options.insert("workspace_id", OptionValue::Text(workspace_id.clone()));
        if let Some(agent) = self.client.user_agent() {
            if !options.contains("user_agent") {
                options.insert("user_agent", OptionValue::Text(agent.to_string()));
            }
        }
        options.parse_id_list("user_ids");

        let params = options.resolve(allowed);
        Ok(PreparedQuery {
            options,
            selection,
            workspace_id,
            params,
        })
    }

    /// Decoded summary report, shared by every reduction in this batch.
    async fn summary(&self, workspace_id: &str, params: &ResolvedParams) -> Result<Arc<SummaryReport>> {
        if let Some(report) = self.batch.report(params) {
            debug!("Summary report already loaded in this batch");
            return Ok(report);
        }
        let body = self
            .responses
            .get_or_fetch(SUMMARY_OPERATION, params, || {
                self.client.summary_report(workspace_id, params)
            })
            .await?
            .into_success()?;
        let report = Arc::new(SummaryReport::from_value(body)?);
        self.batch.store_report(params, Arc::clone(&report));
        Ok(report)
    }
}
