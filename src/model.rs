use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::date_util::parse_opt;

/// Employee role in the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Director,
    Admin,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Director => "director",
            Role::Admin => "admin",
            Role::Other => "other",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "manager" => Role::Manager,
            "director" => Role::Director,
            "admin" => Role::Admin,
            _ => Role::Other,
        }
    }

    /// Roles that own clients and show up as rows in the analytics.
    pub fn is_manager_like(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

/// Which analytics sections an employee may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportAccess {
    pub tasks: bool,
    pub clients: bool,
    pub sales: bool,
    pub deals: bool,
    pub efficiency: bool,
    pub comparison: bool,
}

impl Default for ReportAccess {
    fn default() -> Self {
        Self::full()
    }
}

impl ReportAccess {
    pub fn full() -> Self {
        Self {
            tasks: true,
            clients: true,
            sales: true,
            deals: true,
            efficiency: true,
            comparison: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub report_access: Option<ReportAccess>,
}

impl Employee {
    /// Directors always see everything; everyone else gets their configured
    /// subset, or everything when nothing is configured.
    pub fn effective_access(&self) -> ReportAccess {
        if self.role == Role::Director {
            return ReportAccess::full();
        }
        self.report_access.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationStatus {
    Planned,
    Closed,
    #[serde(other)]
    Unknown,
}

impl CommunicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationStatus::Planned => "planned",
            CommunicationStatus::Closed => "closed",
            CommunicationStatus::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "planned" => CommunicationStatus::Planned,
            "closed" => CommunicationStatus::Closed,
            _ => CommunicationStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationResult {
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl CommunicationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationResult::Success => "success",
            CommunicationResult::Failed => "failed",
            CommunicationResult::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "success" => CommunicationResult::Success,
            "failed" => CommunicationResult::Failed,
            _ => CommunicationResult::Unknown,
        }
    }
}

/// A call, meeting or message logged against a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    #[serde(default)]
    pub id: String,
    pub status: CommunicationStatus,
    #[serde(default)]
    pub result: Option<CommunicationResult>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Communication {
    pub fn is_closed(&self) -> bool {
        self.status == CommunicationStatus::Closed
    }

    /// `closedAt ?? scheduledAt ?? createdAt` for closed communications,
    /// `scheduledAt ?? createdAt` otherwise. A field that is present but
    /// unparseable is skipped in favour of the next one.
    pub fn effective_time(&self) -> Option<NaiveDateTime> {
        let closed = if self.is_closed() {
            parse_opt(self.closed_at.as_deref())
        } else {
            None
        };
        closed
            .or_else(|| parse_opt(self.scheduled_at.as_deref()))
            .or_else(|| parse_opt(self.created_at.as_deref()))
    }

    /// The refusal reason, if this is a closed failed communication with a
    /// non-blank reason.
    pub fn failed_reason(&self) -> Option<&str> {
        if !self.is_closed() || self.result != Some(CommunicationResult::Failed) {
            return None;
        }
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub responsible_id: Option<String>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub client_type: Option<String>,
    /// Free-form tag shown as the client status.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub communications: Vec<Communication>,
    #[serde(default)]
    pub communication_status: Option<String>,
    #[serde(default)]
    pub last_communication_at: Option<String>,
}

impl Client {
    pub fn is_owned_by(&self, employee_id: &str) -> bool {
        self.manager_id.as_deref() == Some(employee_id)
            || self.responsible_id.as_deref() == Some(employee_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Assignee id; blank ids count as unassigned.
    pub fn assignee(&self) -> Option<&str> {
        non_blank(self.assignee_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl Order {
    /// Manager set directly on the order, ignoring blank ids.
    pub fn direct_manager(&self) -> Option<&str> {
        non_blank(self.manager_id.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// Everything the analytics pipeline reads, captured at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub employees: Vec<Employee>,
    pub clients: Vec<Client>,
    pub tasks: Vec<Task>,
    pub orders: Vec<Order>,
}

impl Snapshot {
    pub fn from_json(s: &str) -> crate::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(s)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject records without an id; every id must be unique per collection.
    pub fn validate(&self) -> crate::Result<()> {
        check_ids("employee", self.employees.iter().map(|e| e.id.as_str()))?;
        check_ids("client", self.clients.iter().map(|c| c.id.as_str()))?;
        check_ids("task", self.tasks.iter().map(|t| t.id.as_str()))?;
        check_ids("order", self.orders.iter().map(|o| o.id.as_str()))?;
        Ok(())
    }

    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    /// Managers (and admins) in insertion order.
    pub fn managers(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter().filter(|e| e.role.is_manager_like())
    }
}

fn check_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> crate::Result<()> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(crate::Error::Snapshot(format!("{kind} without an id")));
        }
        if !seen.insert(id) {
            return Err(crate::Error::Snapshot(format!("duplicate {kind} id: {id}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comm(status: CommunicationStatus) -> Communication {
        Communication {
            id: "c".into(),
            status,
            result: None,
            reason: None,
            scheduled_at: None,
            closed_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_effective_time_closed_prefers_closed_at() {
        let mut c = comm(CommunicationStatus::Closed);
        c.created_at = Some("2025-01-01T08:00:00".into());
        c.scheduled_at = Some("2025-01-02T08:00:00".into());
        c.closed_at = Some("2025-01-03T08:00:00".into());
        assert_eq!(
            c.effective_time().unwrap().to_string(),
            "2025-01-03 08:00:00"
        );
    }

    #[test]
    fn test_effective_time_planned_ignores_closed_at() {
        let mut c = comm(CommunicationStatus::Planned);
        c.created_at = Some("2025-01-01T08:00:00".into());
        c.closed_at = Some("2025-01-03T08:00:00".into());
        assert_eq!(
            c.effective_time().unwrap().to_string(),
            "2025-01-01 08:00:00"
        );
    }

    #[test]
    fn test_effective_time_skips_malformed() {
        let mut c = comm(CommunicationStatus::Closed);
        c.closed_at = Some("not a date".into());
        c.scheduled_at = Some("2025-01-02".into());
        assert_eq!(
            c.effective_time().unwrap().to_string(),
            "2025-01-02 00:00:00"
        );
        assert!(comm(CommunicationStatus::Closed).effective_time().is_none());
    }

    #[test]
    fn test_failed_reason_requires_closed_failed_and_text() {
        let mut c = comm(CommunicationStatus::Closed);
        c.result = Some(CommunicationResult::Failed);
        c.reason = Some("  Price  ".into());
        assert_eq!(c.failed_reason(), Some("Price"));

        c.reason = Some("   ".into());
        assert_eq!(c.failed_reason(), None);

        c.reason = Some("Price".into());
        c.status = CommunicationStatus::Planned;
        assert_eq!(c.failed_reason(), None);

        c.status = CommunicationStatus::Closed;
        c.result = Some(CommunicationResult::Success);
        assert_eq!(c.failed_reason(), None);
    }

    #[test]
    fn test_effective_access() {
        let restricted = ReportAccess {
            sales: false,
            ..ReportAccess::full()
        };
        let mut e = Employee {
            id: "e1".into(),
            name: "Eve".into(),
            role: Role::Manager,
            report_access: Some(restricted),
        };
        assert!(!e.effective_access().sales);

        e.role = Role::Director;
        assert_eq!(e.effective_access(), ReportAccess::full());

        e.role = Role::Manager;
        e.report_access = None;
        assert_eq!(e.effective_access(), ReportAccess::full());
    }

    #[test]
    fn test_snapshot_from_json_camel_case() {
        let json = r#"{
            "employees": [
                {"id": "m1", "name": "Anna", "role": "manager",
                 "reportAccess": {"sales": false}},
                {"id": "d1", "name": "Boris", "role": "director"},
                {"id": "x1", "name": "Intern", "role": "intern"}
            ],
            "clients": [
                {"id": "c1", "managerId": "m1", "productCategory": "Toys; Games",
                 "communications": [
                    {"id": "k1", "status": "closed", "result": "failed", "reason": "Price"}
                 ]}
            ],
            "tasks": [{"id": "t1", "assigneeId": null, "status": "new"}],
            "orders": [{"id": "o1", "clientId": "c1", "amount": 12.5}]
        }"#;
        let s = Snapshot::from_json(json).unwrap();
        assert_eq!(s.employees.len(), 3);
        assert_eq!(s.employees[2].role, Role::Other);
        let access = s.employees[0].effective_access();
        assert!(!access.sales);
        assert!(access.tasks);
        assert_eq!(s.clients[0].communications[0].failed_reason(), Some("Price"));
        assert!(s.tasks[0].assignee_id.is_none());
        assert_eq!(s.orders[0].amount, Some(12.5));
        assert_eq!(s.managers().count(), 1);
    }

    #[test]
    fn test_snapshot_rejects_duplicate_ids() {
        let json = r#"{"tasks": [{"id": "t1"}, {"id": "t1"}]}"#;
        let err = Snapshot::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate task id"));
    }

    #[test]
    fn test_client_ownership() {
        let c = Client {
            id: "c1".into(),
            name: String::new(),
            manager_id: Some("m1".into()),
            responsible_id: Some("m2".into()),
            activity_type: None,
            region: None,
            city: None,
            product_category: None,
            client_type: None,
            status: None,
            created_at: None,
            communications: vec![],
            communication_status: None,
            last_communication_at: None,
        };
        assert!(c.is_owned_by("m1"));
        assert!(c.is_owned_by("m2"));
        assert!(!c.is_owned_by("m3"));
    }
}
