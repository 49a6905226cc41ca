//! Fixture builders shared by the unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::{
    Client, Communication, CommunicationResult, CommunicationStatus, Employee, Order, Role, Task,
};

/// Pinned clock used throughout the tests: Friday 2025-03-14 15:00.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap()
}

pub fn employee(id: &str, name: &str, role: Role) -> Employee {
    Employee {
        id: id.to_string(),
        name: name.to_string(),
        role,
        report_access: None,
    }
}

pub fn manager(id: &str, name: &str) -> Employee {
    employee(id, name, Role::Manager)
}

pub fn client(id: &str, manager_id: &str, created_at: &str) -> Client {
    Client {
        id: id.to_string(),
        name: format!("Client {id}"),
        manager_id: Some(manager_id.to_string()),
        responsible_id: None,
        activity_type: Some("Retail".to_string()),
        region: Some("North".to_string()),
        city: Some("Oslo".to_string()),
        product_category: Some("Toys, Electronics".to_string()),
        client_type: Some("B2B".to_string()),
        status: Some("active".to_string()),
        created_at: Some(created_at.to_string()),
        communications: vec![],
        communication_status: None,
        last_communication_at: None,
    }
}

pub fn closed(id: &str, at: &str, result: CommunicationResult) -> Communication {
    Communication {
        id: id.to_string(),
        status: CommunicationStatus::Closed,
        result: Some(result),
        reason: None,
        scheduled_at: None,
        closed_at: Some(at.to_string()),
        created_at: None,
    }
}

pub fn refused(id: &str, at: &str, reason: &str) -> Communication {
    let mut c = closed(id, at, CommunicationResult::Failed);
    c.reason = Some(reason.to_string());
    c
}

pub fn planned(id: &str, at: &str) -> Communication {
    Communication {
        id: id.to_string(),
        status: CommunicationStatus::Planned,
        result: None,
        reason: None,
        scheduled_at: Some(at.to_string()),
        closed_at: None,
        created_at: None,
    }
}

pub fn task(id: &str, assignee: Option<&str>, status: &str) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        assignee_id: assignee.map(str::to_string),
        status: status.to_string(),
        created_at: Some("2024-06-01T09:00:00".to_string()),
        completed_at: None,
    }
}

pub fn order(id: &str, client_id: Option<&str>, manager_id: Option<&str>, created_at: &str) -> Order {
    Order {
        id: id.to_string(),
        client_id: client_id.map(str::to_string),
        manager_id: manager_id.map(str::to_string),
        delivery_method: Some("courier".to_string()),
        status: Some("new".to_string()),
        created_at: Some(created_at.to_string()),
        amount: Some(100.0),
    }
}
