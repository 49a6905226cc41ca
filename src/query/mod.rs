pub mod filters;
pub mod period;
pub mod recency;

use chrono::NaiveDateTime;

pub use filters::{FacetKind, Filters, Selection};
pub use period::{DateRange, PeriodSelector};

/// Everything the dashboard holds as UI state, plus the pinned clock.
#[derive(Debug, Clone)]
pub struct AnalyticsQuery {
    pub period: PeriodSelector,
    pub filters: Filters,
    /// Explicitly selected manager ids; empty means every manager.
    pub selected_managers: Vec<String>,
    pub now: NaiveDateTime,
}

impl AnalyticsQuery {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            period: PeriodSelector::default(),
            filters: Filters::default(),
            selected_managers: Vec::new(),
            now,
        }
    }

    pub fn period(mut self, period: PeriodSelector) -> Self {
        self.period = period;
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn select_manager(mut self, id: &str) -> Self {
        self.selected_managers.push(id.to_string());
        self
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_managers.is_empty()
    }

    pub fn date_range(&self) -> DateRange {
        self.period.resolve(self.now)
    }
}
