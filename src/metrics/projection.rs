//! Flat row shapes consumed by the dashboard charts.
//!
//! Rows follow manager iteration order; nothing here sorts or filters beyond
//! the manager scope.

use std::collections::HashMap;

use serde::Serialize;

use super::{scoped, ManagerMetrics, ManagerScope, TaskTotals};
use crate::model::Snapshot;
use crate::query::filters::matches_client_filters;
use crate::query::recency::latest_failed_reason;
use crate::query::Filters;

pub const DEFAULT_UNASSIGNED_LABEL: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub name: String,
    pub completed: u64,
    pub in_work: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientActivityRow {
    pub name: String,
    pub clients: u64,
    pub communications: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrdersRow {
    pub name: String,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EfficiencyRow {
    pub name: String,
    pub calls: u64,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefusalReasonRow {
    pub reason: String,
    pub count: u64,
}

/// Task chart: one row per manager, plus an unassigned bucket when the
/// totals include unassigned tasks and there are any.
pub fn task_rows(
    metrics: &[ManagerMetrics],
    scope: &ManagerScope<'_>,
    totals: &TaskTotals,
    unassigned_label: &str,
) -> Vec<TaskRow> {
    let mut rows: Vec<TaskRow> = scoped(metrics, scope)
        .map(|m| TaskRow {
            name: m.name.clone(),
            completed: m.tasks_done,
            in_work: m.tasks_in_work,
        })
        .collect();
    if totals.includes_unassigned && totals.unassigned() > 0 {
        rows.push(TaskRow {
            name: unassigned_label.to_string(),
            completed: totals.unassigned_done,
            in_work: totals.unassigned_in_work,
        });
    }
    rows
}

pub fn client_activity_rows(
    metrics: &[ManagerMetrics],
    scope: &ManagerScope<'_>,
) -> Vec<ClientActivityRow> {
    scoped(metrics, scope)
        .map(|m| ClientActivityRow {
            name: m.name.clone(),
            clients: m.clients_added,
            communications: m.communications,
        })
        .collect()
}

pub fn orders_rows(metrics: &[ManagerMetrics], scope: &ManagerScope<'_>) -> Vec<OrdersRow> {
    scoped(metrics, scope)
        .map(|m| OrdersRow {
            name: m.name.clone(),
            orders: m.orders_count,
        })
        .collect()
}

pub fn efficiency_rows(metrics: &[ManagerMetrics], scope: &ManagerScope<'_>) -> Vec<EfficiencyRow> {
    scoped(metrics, scope)
        .map(|m| EfficiencyRow {
            name: m.name.clone(),
            calls: m.efficiency_calls,
            orders: m.efficiency_orders,
        })
        .collect()
}

/// Comparison table: the scoped metric records as they are.
pub fn comparison_rows(metrics: &[ManagerMetrics], scope: &ManagerScope<'_>) -> Vec<ManagerMetrics> {
    scoped(metrics, scope).cloned().collect()
}

/// Count in-scope clients that pass the filters by their latest refusal
/// reason. Sorted by count, then reason.
pub fn refusal_reason_rows(
    snapshot: &Snapshot,
    scope: &ManagerScope<'_>,
    filters: &Filters,
) -> Vec<RefusalReasonRow> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for client in &snapshot.clients {
        let owned = [client.manager_id.as_deref(), client.responsible_id.as_deref()]
            .into_iter()
            .flatten()
            .any(|id| scope.contains(id));
        if !owned || !matches_client_filters(client, filters) {
            continue;
        }
        if let Some(reason) = latest_failed_reason(client) {
            *counts.entry(reason).or_default() += 1;
        }
    }
    let mut rows: Vec<RefusalReasonRow> = counts
        .into_iter()
        .map(|(reason, count)| RefusalReasonRow {
            reason: reason.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{compute_manager_metrics, compute_task_totals};
    use crate::query::{AnalyticsQuery, FacetKind};
    use crate::test_support::*;

    fn snapshot() -> Snapshot {
        let mut c1 = client("c1", "m2", "2025-03-12");
        c1.communications = vec![refused("k1", "2025-03-12T10:00:00", "Price")];
        let mut c2 = client("c2", "m1", "2025-03-12");
        c2.communications = vec![refused("k2", "2025-03-12T10:00:00", "Price")];
        let mut c3 = client("c3", "m1", "2025-03-12");
        c3.region = Some("South".into());
        c3.communications = vec![refused("k3", "2025-03-12T10:00:00", "Competitor")];
        Snapshot {
            employees: vec![manager("m2", "Boris"), manager("m1", "Anna")],
            clients: vec![c1, c2, c3],
            tasks: vec![
                task("t1", Some("m1"), "completed"),
                task("t2", None, "new"),
                task("t3", None, "completed"),
            ],
            orders: vec![order("o1", Some("c2"), None, "2025-03-13")],
        }
    }

    fn setup(selection: &[String]) -> (Snapshot, Vec<ManagerMetrics>) {
        let s = snapshot();
        let mut q = AnalyticsQuery::new(now());
        q.selected_managers = selection.to_vec();
        let metrics = compute_manager_metrics(&s, &q);
        (s, metrics)
    }

    #[test]
    fn test_rows_follow_manager_order() {
        let (s, metrics) = setup(&[]);
        let scope = ManagerScope::new(&s, &[]);
        let names: Vec<String> = orders_rows(&metrics, &scope)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Boris", "Anna"]);
    }

    #[test]
    fn test_task_rows_with_unassigned_bucket() {
        let (s, metrics) = setup(&[]);
        let scope = ManagerScope::new(&s, &[]);
        let totals = compute_task_totals(&s, &scope);
        let rows = task_rows(&metrics, &scope, &totals, "Nobody");
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[2],
            TaskRow {
                name: "Nobody".into(),
                completed: 1,
                in_work: 1
            }
        );
        assert_eq!(
            rows[1],
            TaskRow {
                name: "Anna".into(),
                completed: 1,
                in_work: 0
            }
        );
    }

    #[test]
    fn test_task_rows_without_bucket_when_selected() {
        let selection = vec!["m1".to_string()];
        let (s, metrics) = setup(&selection);
        let scope = ManagerScope::new(&s, &selection);
        let totals = compute_task_totals(&s, &scope);
        let rows = task_rows(&metrics, &scope, &totals, DEFAULT_UNASSIGNED_LABEL);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Anna");
    }

    #[test]
    fn test_no_bucket_when_nothing_unassigned() {
        let (mut s, _) = setup(&[]);
        s.tasks.retain(|t| t.assignee_id.is_some());
        let q = AnalyticsQuery::new(now());
        let metrics = compute_manager_metrics(&s, &q);
        let scope = ManagerScope::new(&s, &[]);
        let totals = compute_task_totals(&s, &scope);
        let rows = task_rows(&metrics, &scope, &totals, DEFAULT_UNASSIGNED_LABEL);
        assert!(rows.iter().all(|r| r.name != DEFAULT_UNASSIGNED_LABEL));
    }

    #[test]
    fn test_chart_rows_mirror_metrics() {
        let (s, metrics) = setup(&[]);
        let scope = ManagerScope::new(&s, &[]);
        let activity = client_activity_rows(&metrics, &scope);
        let efficiency = efficiency_rows(&metrics, &scope);
        let comparison = comparison_rows(&metrics, &scope);
        for (i, m) in metrics.iter().enumerate() {
            assert_eq!(activity[i].clients, m.clients_added);
            assert_eq!(activity[i].communications, m.communications);
            assert_eq!(efficiency[i].calls, m.efficiency_calls);
            assert_eq!(efficiency[i].orders, m.efficiency_orders);
            assert_eq!(&comparison[i], m);
        }
    }

    #[test]
    fn test_refusal_reason_rows() {
        let (s, _) = setup(&[]);
        let scope = ManagerScope::new(&s, &[]);
        let rows = refusal_reason_rows(&s, &scope, &Filters::new());
        assert_eq!(
            rows,
            vec![
                RefusalReasonRow {
                    reason: "Price".into(),
                    count: 2
                },
                RefusalReasonRow {
                    reason: "Competitor".into(),
                    count: 1
                },
            ]
        );

        let north = Filters::new().with(FacetKind::Region, "North");
        let only_m1 = vec!["m1".to_string()];
        let scope = ManagerScope::new(&s, &only_m1);
        let rows = refusal_reason_rows(&s, &scope, &north);
        assert_eq!(
            rows,
            vec![RefusalReasonRow {
                reason: "Price".into(),
                count: 1
            }]
        );
    }
}
