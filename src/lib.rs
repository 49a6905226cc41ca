pub mod date_util;
pub mod error;
pub mod metrics;
pub mod model;
pub mod query;
pub mod report;
pub mod settings;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use metrics::{ManagerMetrics, ManagerScope, Summary, TaskTotals};
pub use model::{Client, Communication, Employee, Order, ReportAccess, Role, Snapshot, Task};
pub use query::{AnalyticsQuery, DateRange, FacetKind, Filters, PeriodSelector, Selection};
pub use report::{build_report, AnalyticsReport, Charts, ReportOptions, Section};
pub use settings::Settings;
pub use storage::repository::EntityCounts;
pub use storage::Database;

use chrono::NaiveDateTime;

use storage::repository;

/// What the caller asks for; unset fields come from the stored settings.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub period: Option<PeriodSelector>,
    pub filters: Filters,
    pub managers: Vec<String>,
    pub viewer: Option<String>,
    /// Pinned clock; `None` means the local time at the call.
    pub now: Option<NaiveDateTime>,
}

/// Main entry point: a local CRM store plus the analytics pipeline over it.
pub struct CrmDash {
    db: Database,
}

impl CrmDash {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Import ─────────────────────────────────────────────────────

    /// Validate and upsert a snapshot; returns the number of records written.
    pub async fn import_snapshot(&self, snapshot: Snapshot) -> Result<usize> {
        snapshot.validate()?;
        let written = self
            .db
            .writer()
            .call(move |conn| repository::import_snapshot(conn, &snapshot))
            .await?;
        log::info!("imported {written} records");
        Ok(written)
    }

    /// Read a JSON snapshot file and import it.
    pub async fn import_file(&self, path: impl AsRef<std::path::Path>) -> Result<usize> {
        let snapshot = read_snapshot_file(path)?;
        self.import_snapshot(snapshot).await
    }

    /// Everything in the store, in insertion order.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let snapshot = self
            .db
            .reader()
            .call(|conn| repository::load_snapshot(conn))
            .await?;
        Ok(snapshot)
    }

    pub async fn status(&self) -> Result<EntityCounts> {
        let counts = self
            .db
            .reader()
            .call(|conn| repository::count_entities(conn))
            .await?;
        Ok(counts)
    }

    // ── Reports ────────────────────────────────────────────────────

    pub async fn settings(&self) -> Result<Settings> {
        let settings = self
            .db
            .reader()
            .call(|conn| Settings::load(conn))
            .await?;
        Ok(settings)
    }

    /// Build a report over the stored data.
    pub async fn report(&self, request: ReportRequest) -> Result<AnalyticsReport> {
        let snapshot = self.snapshot().await?;
        self.report_on(&snapshot, request).await
    }

    /// Build a report over an explicit snapshot, still honouring the stored
    /// settings.
    pub async fn report_on(
        &self,
        snapshot: &Snapshot,
        request: ReportRequest,
    ) -> Result<AnalyticsReport> {
        let settings = self.settings().await?;
        Ok(report_with_settings(snapshot, request, &settings))
    }

    /// Distinct values for a filter picker.
    pub async fn facet_options(&self, kind: FacetKind) -> Result<Vec<String>> {
        let snapshot = self.snapshot().await?;
        Ok(query::filters::facet_options(&snapshot, kind))
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

/// Parse and validate a JSON snapshot file.
pub fn read_snapshot_file(path: impl AsRef<std::path::Path>) -> Result<Snapshot> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Snapshot::from_json(&text)
}

/// Report over a snapshot file without touching any store.
pub fn report_snapshot_file(
    path: impl AsRef<std::path::Path>,
    request: ReportRequest,
    settings: &Settings,
) -> Result<AnalyticsReport> {
    let snapshot = read_snapshot_file(path)?;
    Ok(report_with_settings(&snapshot, request, settings))
}

/// Combine a request with stored settings and run the pipeline.
pub fn report_with_settings(
    snapshot: &Snapshot,
    request: ReportRequest,
    settings: &Settings,
) -> AnalyticsReport {
    let now = request
        .now
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    let query = AnalyticsQuery {
        period: request
            .period
            .unwrap_or_else(|| settings.default_period.clone()),
        filters: request.filters,
        selected_managers: request.managers,
        now,
    };
    let viewer = request.viewer.or_else(|| settings.viewer_id.clone());
    let options = ReportOptions {
        access: report::resolve_access(snapshot, viewer.as_deref()),
        unassigned_label: settings.unassigned_label.clone(),
    };
    build_report(snapshot, &query, &options)
}
