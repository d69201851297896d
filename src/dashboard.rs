//! Aggregate chart data for the dashboard.
//!
//! Rendering is left to the client; this module only counts tickets.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::{
    access::Caller,
    category::CategoryTree,
    db::{DbPool, list_categories},
    error::HelpdeskError,
    filter::{FilterCriteria, FilterResolver},
    models::Ticket,
    params::{Param, ParameterStore},
    query::{TicketFilter, get_tickets},
    status::TicketStatus,
};

/// Days covered when the caller gives no start date.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Start.
    pub from: NaiveDateTime,
    /// End.
    pub to: NaiveDateTime,
}

impl DateWindow {
    /// Window ending at `to` (default `now`) and starting at `from`
    /// (default [`DEFAULT_WINDOW_DAYS`] earlier).
    #[must_use]
    pub fn new(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>, now: NaiveDateTime) -> Self {
        let end = to.unwrap_or(now);
        Self {
            from: from.unwrap_or_else(|| end - Duration::days(DEFAULT_WINDOW_DAYS)),
            to: end,
        }
    }

    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool { self.from <= at && at <= self.to }
}

/// One bar or pie slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartValue {
    /// Category label.
    pub label: String,
    /// Number of tickets.
    pub value: usize,
}

/// One point of a line series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityPoint {
    /// Series name: the status display name.
    pub label: String,
    /// Day, formatted `MM-dd-yyyy`.
    pub x: String,
    /// Number of tickets.
    pub y: usize,
}

/// Chart payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chart<T> {
    /// Chart title.
    pub title: String,
    /// Value-axis label, for charts that have one.
    pub axis_label: Option<String>,
    /// Data in display order.
    pub data: Vec<T>,
}

fn by_count_then_label(a: &ChartValue, b: &ChartValue) -> Ordering {
    b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label))
}

fn count_by_label(labels: impl Iterator<Item = String>) -> Vec<ChartValue> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut values: Vec<ChartValue> = counts
        .into_iter()
        .map(|(label, value)| ChartValue { label, value })
        .collect();
    values.sort_by(by_count_then_label);
    values
}

/// Tickets per category label, largest first.
#[must_use]
pub fn status_breakdown(tickets: &[Ticket], tree: &CategoryTree) -> Vec<ChartValue> {
    count_by_label(tickets.iter().map(|t| tree.display_name_of(&t.category_id)))
}

/// Whether a ticket counts as activity within `window`: submitted inside it,
/// or closed with its last change inside it.
#[must_use]
pub fn is_activity(ticket: &Ticket, window: &DateWindow) -> bool {
    window.contains(ticket.date_submitted)
        || (ticket.status == TicketStatus::Closed && window.contains(ticket.last_updated))
}

/// Active tickets per day of last change and status, ordered by day then
/// status.
#[must_use]
pub fn activity_series(tickets: &[Ticket], window: &DateWindow) -> Vec<ActivityPoint> {
    let mut counts: BTreeMap<(chrono::NaiveDate, TicketStatus), usize> = BTreeMap::new();
    for ticket in tickets
        .iter()
        .filter(|t| is_activity(t, window) && window.contains(t.last_updated))
    {
        *counts
            .entry((ticket.last_updated.date(), ticket.status))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((day, status), y)| ActivityPoint {
            label: status.display_name().to_owned(),
            x: day.format("%m-%d-%Y").to_string(),
            y,
        })
        .collect()
}

/// Tickets submitted inside `window` per category label, largest first.
#[must_use]
pub fn request_types(tickets: &[Ticket], tree: &CategoryTree, window: &DateWindow) -> Vec<ChartValue> {
    count_by_label(
        tickets
            .iter()
            .filter(|t| window.contains(t.date_submitted))
            .map(|t| tree.display_name_of(&t.category_id)),
    )
}

/// Loads visible tickets and shapes them into charts.
#[derive(Clone)]
pub struct DashboardService {
    pool: DbPool,
    params: Arc<dyn ParameterStore>,
    resolver: FilterResolver,
}

impl DashboardService {
    /// Read tickets from `pool` and chart titles from `params`.
    #[must_use]
    pub fn new(pool: DbPool, params: Arc<dyn ParameterStore>) -> Self {
        Self {
            pool,
            params,
            resolver: FilterResolver,
        }
    }

    async fn tickets(
        &self,
        criteria: &FilterCriteria,
        caller: &Caller,
    ) -> Result<(Vec<Ticket>, CategoryTree), HelpdeskError> {
        let mut conn = self.pool.get().await?;
        let tree = CategoryTree::new(list_categories(&mut conn, true).await?);
        let (resolved, _) = self.resolver.resolve(criteria, &tree)?;
        let filter = TicketFilter::from(resolved);
        let tickets = get_tickets(&mut conn, &filter, caller).await?;
        Ok((tickets, tree))
    }

    async fn text(&self, param: Param) -> Result<String, HelpdeskError> {
        Ok(self
            .params
            .optional(param)
            .await?
            .unwrap_or_else(|| param.default_value().to_owned()))
    }

    /// Bar chart of matching tickets per category.
    ///
    /// # Errors
    /// Returns filter, parameter or database errors.
    pub async fn status_chart(
        &self,
        criteria: &FilterCriteria,
        caller: &Caller,
    ) -> Result<Chart<ChartValue>, HelpdeskError> {
        let (tickets, tree) = self.tickets(criteria, caller).await?;
        Ok(Chart {
            title: self.text(Param::StatusChartTitle).await?,
            axis_label: Some(self.text(Param::StatusChartLabel).await?),
            data: status_breakdown(&tickets, &tree),
        })
    }

    /// Line chart of activity inside `window`.
    ///
    /// # Errors
    /// Returns parameter or database errors.
    pub async fn activity_chart(
        &self,
        window: &DateWindow,
        caller: &Caller,
    ) -> Result<Chart<ActivityPoint>, HelpdeskError> {
        let (tickets, _) = self.tickets(&FilterCriteria::default(), caller).await?;
        Ok(Chart {
            title: self.text(Param::ActivityChartTitle).await?,
            axis_label: Some(self.text(Param::ActivityChartLabel).await?),
            data: activity_series(&tickets, window),
        })
    }

    /// Pie chart of tickets submitted inside `window` per category.
    ///
    /// # Errors
    /// Returns parameter or database errors.
    pub async fn request_type_chart(
        &self,
        window: &DateWindow,
        caller: &Caller,
    ) -> Result<Chart<ChartValue>, HelpdeskError> {
        let (tickets, tree) = self.tickets(&FilterCriteria::default(), caller).await?;
        Ok(Chart {
            title: self.text(Param::RequestTypeChartTitle).await?,
            axis_label: None,
            data: request_types(&tickets, &tree, window),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::{sample_category, sample_ticket};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid date")
    }

    #[fixture]
    fn tree() -> CategoryTree {
        CategoryTree::new(vec![
            sample_category("bld", "Buildings", None, "facilities"),
            sample_category("hvac", "HVAC", Some("bld"), "hvac-tech"),
            sample_category("it", "IT", None, "helpdesk"),
        ])
    }

    fn ticket(id: &str, category: &str, submitted: u32, updated: u32, status: TicketStatus) -> Ticket {
        let mut t = sample_ticket(id, category, "jdoe");
        t.date_submitted = at(submitted);
        t.last_updated = at(updated);
        t.status = status;
        t
    }

    #[rstest]
    fn breakdown_orders_by_count(tree: CategoryTree) {
        let tickets = vec![
            ticket("1", "it", 1, 1, TicketStatus::Submitted),
            ticket("2", "hvac", 1, 1, TicketStatus::Submitted),
            ticket("3", "hvac", 2, 2, TicketStatus::Reviewed),
            ticket("4", "bld", 2, 2, TicketStatus::Reviewed),
        ];
        let chart = status_breakdown(&tickets, &tree);
        let labels: Vec<(&str, usize)> = chart.iter().map(|v| (v.label.as_str(), v.value)).collect();
        assert_eq!(
            labels,
            vec![("Buildings - HVAC", 2), ("Buildings - General", 1), ("IT - General", 1)]
        );
    }

    #[rstest]
    fn activity_counts_closures_inside_window() {
        let window = DateWindow {
            from: at(10),
            to: at(20),
        };
        let tickets = vec![
            ticket("in", "it", 12, 12, TicketStatus::Submitted),
            ticket("closed", "it", 1, 15, TicketStatus::Closed),
            ticket("stale", "it", 1, 15, TicketStatus::Monitoring),
            ticket("late", "it", 21, 21, TicketStatus::Submitted),
        ];
        let points = activity_series(&tickets, &window);
        assert_eq!(
            points,
            vec![
                ActivityPoint {
                    label: "Submitted".to_owned(),
                    x: "03-12-2024".to_owned(),
                    y: 1,
                },
                ActivityPoint {
                    label: "Closed".to_owned(),
                    x: "03-15-2024".to_owned(),
                    y: 1,
                },
            ]
        );
    }

    #[rstest]
    fn request_types_use_submission_date(tree: CategoryTree) {
        let window = DateWindow {
            from: at(10),
            to: at(20),
        };
        let tickets = vec![
            ticket("a", "hvac", 11, 11, TicketStatus::Submitted),
            ticket("b", "hvac", 12, 12, TicketStatus::Closed),
            ticket("c", "it", 5, 15, TicketStatus::Closed),
        ];
        assert_eq!(
            request_types(&tickets, &tree, &window),
            vec![ChartValue {
                label: "Buildings - HVAC".to_owned(),
                value: 2,
            }]
        );
    }

    #[rstest]
    fn window_defaults_to_trailing_month() {
        let window = DateWindow::new(None, None, at(31));
        assert_eq!(window.to, at(31));
        assert_eq!(window.from, at(1));
    }
}
