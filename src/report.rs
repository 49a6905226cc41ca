use serde::Serialize;

use crate::metrics::projection::{
    self, ClientActivityRow, EfficiencyRow, OrdersRow, RefusalReasonRow, TaskRow,
};
use crate::metrics::{
    compute_manager_metrics, compute_task_totals, summarize, ManagerMetrics, ManagerScope, Summary,
};
use crate::model::{ReportAccess, Snapshot};
use crate::query::{AnalyticsQuery, DateRange};

/// A gated section of the analytics page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Tasks,
    Clients,
    Sales,
    Deals,
    Efficiency,
    Comparison,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Tasks,
        Section::Clients,
        Section::Sales,
        Section::Deals,
        Section::Efficiency,
        Section::Comparison,
    ];
}

impl ReportAccess {
    pub fn allows(&self, section: Section) -> bool {
        match section {
            Section::Tasks => self.tasks,
            Section::Clients => self.clients,
            Section::Sales => self.sales,
            Section::Deals => self.deals,
            Section::Efficiency => self.efficiency,
            Section::Comparison => self.comparison,
        }
    }

    pub fn visible_sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.allows(*s))
            .collect()
    }
}

/// Section access for the given viewer. No viewer, or one not in the
/// snapshot, sees everything.
pub fn resolve_access(snapshot: &Snapshot, viewer: Option<&str>) -> ReportAccess {
    let Some(id) = viewer else {
        return ReportAccess::full();
    };
    match snapshot.employee(id) {
        Some(employee) => employee.effective_access(),
        None => {
            log::warn!("viewer {id} is not a known employee, showing all sections");
            ReportAccess::full()
        }
    }
}

/// Chart feeds. A section the viewer may not see is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub tasks: Option<Vec<TaskRow>>,
    pub clients: Option<Vec<ClientActivityRow>>,
    pub orders: Option<Vec<OrdersRow>>,
    pub efficiency: Option<Vec<EfficiencyRow>>,
    pub refusal_reasons: Option<Vec<RefusalReasonRow>>,
    pub comparison: Option<Vec<ManagerMetrics>>,
}

/// Options that shape presentation but not the numbers.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub access: ReportAccess,
    pub unassigned_label: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            access: ReportAccess::full(),
            unassigned_label: projection::DEFAULT_UNASSIGNED_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period_key: String,
    pub range: DateRange,
    pub selected_managers: Vec<String>,
    /// Every manager, in employee order, regardless of selection.
    pub managers: Vec<ManagerMetrics>,
    pub summary: Summary,
    pub sections: Vec<Section>,
    pub charts: Charts,
}

/// Run the whole pipeline: resolve, filter, reduce, summarize, project.
pub fn build_report(
    snapshot: &Snapshot,
    query: &AnalyticsQuery,
    options: &ReportOptions,
) -> AnalyticsReport {
    let managers = compute_manager_metrics(snapshot, query);
    let scope = ManagerScope::new(snapshot, &query.selected_managers);
    let totals = compute_task_totals(snapshot, &scope);
    let summary = summarize(&managers, &scope, &totals);

    let access = &options.access;
    let gate = |section: Section| access.allows(section);
    let charts = Charts {
        tasks: gate(Section::Tasks).then(|| {
            projection::task_rows(&managers, &scope, &totals, &options.unassigned_label)
        }),
        clients: gate(Section::Clients)
            .then(|| projection::client_activity_rows(&managers, &scope)),
        orders: gate(Section::Sales).then(|| projection::orders_rows(&managers, &scope)),
        efficiency: gate(Section::Efficiency)
            .then(|| projection::efficiency_rows(&managers, &scope)),
        refusal_reasons: gate(Section::Deals)
            .then(|| projection::refusal_reason_rows(snapshot, &scope, &query.filters)),
        comparison: gate(Section::Comparison)
            .then(|| projection::comparison_rows(&managers, &scope)),
    };

    AnalyticsReport {
        period_key: query.period.to_key(),
        range: query.date_range(),
        selected_managers: query.selected_managers.clone(),
        managers,
        summary,
        sections: access.visible_sections(),
        charts,
    }
}
