use rusqlite::Connection;

use crate::metrics::projection::DEFAULT_UNASSIGNED_LABEL;
use crate::query::PeriodSelector;
use crate::storage::repository;

pub const KEY_DEFAULT_PERIOD: &str = "default_period";
pub const KEY_UNASSIGNED_LABEL: &str = "unassigned_label";
pub const KEY_VIEWER_ID: &str = "viewer_id";

/// Settings the report pipeline reads from `app_config`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub default_period: PeriodSelector,
    pub unassigned_label: String,
    pub viewer_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_period: PeriodSelector::default(),
            unassigned_label: DEFAULT_UNASSIGNED_LABEL.to_string(),
            viewer_id: None,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults for anything unset or invalid.
    pub fn load(conn: &Connection) -> Result<Self, rusqlite::Error> {
        let mut settings = Settings::default();

        if let Some(raw) = repository::get_config(conn, KEY_DEFAULT_PERIOD)? {
            match PeriodSelector::parse(&raw) {
                Ok(period) => settings.default_period = period,
                Err(e) => log::warn!("ignoring {KEY_DEFAULT_PERIOD}: {e}"),
            }
        }

        if let Some(label) = repository::get_config(conn, KEY_UNASSIGNED_LABEL)? {
            if !label.trim().is_empty() {
                settings.unassigned_label = label;
            }
        }

        settings.viewer_id = repository::get_config(conn, KEY_VIEWER_ID)?
            .filter(|v| !v.trim().is_empty());

        Ok(settings)
    }
}
