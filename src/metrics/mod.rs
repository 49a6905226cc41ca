pub mod projection;
pub mod types;

pub use types::*;

use std::collections::HashSet;

use crate::date_util::parse_opt;
use crate::model::{Client, Employee, Order, Snapshot};
use crate::query::filters::{matches_client_filters, matches_order_filters, ClientIndex};
use crate::query::recency::{deal_status, DealStatus};
use crate::query::{AnalyticsQuery, DateRange};

/// The managers whose metrics feed the summary and the charts.
///
/// An empty selection means every manager, and only then are tasks without a
/// known manager folded into the task totals.
#[derive(Debug, Clone)]
pub struct ManagerScope<'a> {
    known: HashSet<&'a str>,
    ids: HashSet<&'a str>,
    explicit: bool,
}

impl<'a> ManagerScope<'a> {
    pub fn new(snapshot: &'a Snapshot, selected: &[String]) -> Self {
        let known: HashSet<&str> = snapshot.managers().map(|m| m.id.as_str()).collect();
        if selected.is_empty() {
            return Self {
                ids: known.clone(),
                known,
                explicit: false,
            };
        }
        let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();
        for id in &wanted {
            if !known.contains(id) {
                log::warn!("selected manager {id} is not a known manager, ignoring");
            }
        }
        let ids = known
            .iter()
            .copied()
            .filter(|id| wanted.contains(id))
            .collect();
        Self {
            known,
            ids,
            explicit: true,
        }
    }

    pub fn contains(&self, manager_id: &str) -> bool {
        self.ids.contains(manager_id)
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn includes_unassigned(&self) -> bool {
        !self.explicit
    }

    /// Unassigned: no assignee, or one that is not a known manager.
    pub fn is_unassigned(&self, assignee: Option<&str>) -> bool {
        match assignee {
            Some(id) => !self.known.contains(id),
            None => true,
        }
    }
}

/// Per-run state shared by every manager's reduction: the resolved period and
/// the clients and orders that survive the facet filters.
struct Pass<'a> {
    range: DateRange,
    clients: Vec<&'a Client>,
    orders: Vec<&'a Order>,
    index: ClientIndex<'a>,
}

impl<'a> Pass<'a> {
    fn new(snapshot: &'a Snapshot, query: &AnalyticsQuery) -> Self {
        let index = ClientIndex::new(&snapshot.clients);
        let dangling = snapshot
            .orders
            .iter()
            .filter(|o| o.client_id.is_some() && index.owner_of(o).is_none())
            .count();
        if dangling > 0 {
            log::warn!("{dangling} orders reference unknown clients");
        }
        let clients: Vec<&Client> = snapshot
            .clients
            .iter()
            .filter(|c| matches_client_filters(c, &query.filters))
            .collect();
        let orders: Vec<&Order> = snapshot
            .orders
            .iter()
            .filter(|o| matches_order_filters(o, &query.filters, &index))
            .collect();
        let range = query.date_range();
        log::debug!(
            "analytics pass: period {} -> {:?}..{:?}, {}/{} clients and {}/{} orders pass filters",
            query.period,
            range.from(),
            range.to(),
            clients.len(),
            snapshot.clients.len(),
            orders.len(),
            snapshot.orders.len()
        );
        Self {
            range,
            clients,
            orders,
            index,
        }
    }

    /// Direct attribution wins; otherwise the owning client's manager or
    /// responsible person.
    fn order_attributed_to(&self, order: &Order, manager_id: &str) -> bool {
        match order.direct_manager() {
            Some(id) => id == manager_id,
            None => self
                .index
                .owner_of(order)
                .is_some_and(|c| c.is_owned_by(manager_id)),
        }
    }

    fn reduce(&self, snapshot: &Snapshot, manager: &Employee) -> ManagerMetrics {
        let id = manager.id.as_str();
        let mut m = ManagerMetrics {
            manager_id: manager.id.clone(),
            name: manager.name.clone(),
            ..ManagerMetrics::default()
        };

        for task in snapshot.tasks.iter().filter(|t| t.assignee() == Some(id)) {
            if task.is_completed() {
                m.tasks_done += 1;
            } else {
                m.tasks_in_work += 1;
            }
        }

        for client in self.clients.iter().filter(|c| c.is_owned_by(id)) {
            if self.range.contains_opt(parse_opt(client.created_at.as_deref())) {
                m.clients_added += 1;
            }
            m.communications += client
                .communications
                .iter()
                .filter(|k| k.is_closed() && self.range.contains_opt(k.effective_time()))
                .count() as u64;
            match deal_status(client) {
                Some(DealStatus::Success) => m.deals_success += 1,
                Some(DealStatus::Refused) => m.deals_refused += 1,
                Some(DealStatus::InProgress) | None => {}
            }
        }

        m.orders_count = self
            .orders
            .iter()
            .filter(|o| self.order_attributed_to(o, id))
            .filter(|o| self.range.contains_opt(parse_opt(o.created_at.as_deref())))
            .count() as u64;

        m.efficiency_calls = m.communications;
        m.efficiency_orders = m.orders_count;
        m
    }
}

/// Reduce the snapshot to one metrics record per manager, in the order the
/// managers appear in the employee list.
pub fn compute_manager_metrics(snapshot: &Snapshot, query: &AnalyticsQuery) -> Vec<ManagerMetrics> {
    let pass = Pass::new(snapshot, query);
    snapshot
        .managers()
        .map(|manager| pass.reduce(snapshot, manager))
        .collect()
}

/// Task totals over the full task collection, independent of the period.
pub fn compute_task_totals(snapshot: &Snapshot, scope: &ManagerScope<'_>) -> TaskTotals {
    let mut totals = TaskTotals {
        includes_unassigned: scope.includes_unassigned(),
        ..TaskTotals::default()
    };
    for task in &snapshot.tasks {
        let assignee = task.assignee();
        let done = task.is_completed();
        if assignee.is_some_and(|id| scope.contains(id)) {
            if done {
                totals.done += 1;
            } else {
                totals.in_work += 1;
            }
        } else if scope.includes_unassigned() && scope.is_unassigned(assignee) {
            if done {
                totals.done += 1;
                totals.unassigned_done += 1;
            } else {
                totals.in_work += 1;
                totals.unassigned_in_work += 1;
            }
        }
    }
    totals
}

/// Metrics of the managers in scope, preserving order.
pub fn scoped<'m>(
    metrics: &'m [ManagerMetrics],
    scope: &'m ManagerScope<'m>,
) -> impl Iterator<Item = &'m ManagerMetrics> {
    metrics.iter().filter(move |m| scope.contains(&m.manager_id))
}

/// Sum the per-manager metrics in scope; task totals come from
/// [`compute_task_totals`].
pub fn summarize(metrics: &[ManagerMetrics], scope: &ManagerScope<'_>, tasks: &TaskTotals) -> Summary {
    let mut summary = scoped(metrics, scope).fold(Summary::default(), |mut s, m| {
        s.manager_count += 1;
        s.clients_added += m.clients_added;
        s.communications += m.communications;
        s.orders_count += m.orders_count;
        s.deals_success += m.deals_success;
        s.deals_refused += m.deals_refused;
        s
    });
    summary.tasks_done = tasks.done;
    summary.tasks_in_work = tasks.in_work;
    summary.unassigned_tasks_included = tasks.includes_unassigned;
    summary
}
