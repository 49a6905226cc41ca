use serde::Serialize;

/// Metrics for one manager. Task and deal counts reflect current state;
/// clients, communications and orders are activity inside the period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerMetrics {
    pub manager_id: String,
    pub name: String,
    pub tasks_done: u64,
    pub tasks_in_work: u64,
    pub clients_added: u64,
    pub communications: u64,
    pub orders_count: u64,
    pub deals_success: u64,
    pub deals_refused: u64,
    pub efficiency_calls: u64,
    pub efficiency_orders: u64,
}

/// Task totals over the whole task collection for a manager scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTotals {
    pub done: u64,
    pub in_work: u64,
    /// Whether tasks with no known manager were folded in.
    pub includes_unassigned: bool,
    pub unassigned_done: u64,
    pub unassigned_in_work: u64,
}

impl TaskTotals {
    pub fn unassigned(&self) -> u64 {
        self.unassigned_done + self.unassigned_in_work
    }
}

/// Totals across the managers in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub manager_count: u64,
    pub clients_added: u64,
    pub communications: u64,
    pub orders_count: u64,
    pub deals_success: u64,
    pub deals_refused: u64,
    pub tasks_done: u64,
    pub tasks_in_work: u64,
    pub unassigned_tasks_included: bool,
}
