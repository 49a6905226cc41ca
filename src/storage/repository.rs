use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{
    Client, Communication, CommunicationResult, CommunicationStatus, Employee, Order, ReportAccess,
    Role, Snapshot, Task,
};

// ── Employees ──────────────────────────────────────────────────────

pub fn upsert_employee(conn: &Connection, employee: &Employee) -> Result<(), rusqlite::Error> {
    let access = employee
        .report_access
        .map(|a| serde_json::to_string(&a))
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO employees (employee_id, name, role, report_access, updated_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT(employee_id) DO UPDATE SET
            name=excluded.name, role=excluded.role,
            report_access=excluded.report_access, updated_at=excluded.updated_at",
        params![employee.id, employee.name, employee.role.as_str(), access],
    )?;
    Ok(())
}

fn list_employees(conn: &Connection) -> Result<Vec<Employee>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT employee_id, name, role, report_access FROM employees ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        let role: String = row.get(2)?;
        let access: Option<String> = row.get(3)?;
        let report_access = access
            .map(|s| serde_json::from_str::<ReportAccess>(&s))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;
        Ok(Employee {
            id: row.get(0)?,
            name: row.get(1)?,
            role: Role::from_str_lossy(&role),
            report_access,
        })
    })?;
    rows.collect()
}

// ── Clients ────────────────────────────────────────────────────────

/// Upsert a client and replace its communication history.
pub fn upsert_client(conn: &Connection, client: &Client) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO clients (
            client_id, name, manager_id, responsible_id, activity_type, region, city,
            product_category, client_type, status, created_at,
            communication_status, last_communication_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now'))
        ON CONFLICT(client_id) DO UPDATE SET
            name=excluded.name, manager_id=excluded.manager_id,
            responsible_id=excluded.responsible_id, activity_type=excluded.activity_type,
            region=excluded.region, city=excluded.city,
            product_category=excluded.product_category, client_type=excluded.client_type,
            status=excluded.status, created_at=excluded.created_at,
            communication_status=excluded.communication_status,
            last_communication_at=excluded.last_communication_at,
            updated_at=excluded.updated_at",
        params![
            client.id,
            client.name,
            client.manager_id,
            client.responsible_id,
            client.activity_type,
            client.region,
            client.city,
            client.product_category,
            client.client_type,
            client.status,
            client.created_at,
            client.communication_status,
            client.last_communication_at,
        ],
    )?;

    conn.execute(
        "DELETE FROM communications WHERE client_id = ?1",
        params![client.id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO communications (
            client_id, position, communication_id, status, result, reason,
            scheduled_at, closed_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for (position, comm) in client.communications.iter().enumerate() {
        stmt.execute(params![
            client.id,
            position as i64,
            comm.id,
            comm.status.as_str(),
            comm.result.map(|r| r.as_str()),
            comm.reason,
            comm.scheduled_at,
            comm.closed_at,
            comm.created_at,
        ])?;
    }
    Ok(())
}

fn list_clients(conn: &Connection) -> Result<Vec<Client>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT client_id, name, manager_id, responsible_id, activity_type, region, city,
                product_category, client_type, status, created_at,
                communication_status, last_communication_at
         FROM clients ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            manager_id: row.get(2)?,
            responsible_id: row.get(3)?,
            activity_type: row.get(4)?,
            region: row.get(5)?,
            city: row.get(6)?,
            product_category: row.get(7)?,
            client_type: row.get(8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
            communications: Vec::new(),
            communication_status: row.get(11)?,
            last_communication_at: row.get(12)?,
        })
    })?;
    let mut clients: Vec<Client> = rows.collect::<Result<_, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT client_id, communication_id, status, result, reason,
                scheduled_at, closed_at, created_at
         FROM communications ORDER BY client_id, position",
    )?;
    let comms = stmt.query_map([], |row| {
        let client_id: String = row.get(0)?;
        let status: String = row.get(2)?;
        let result: Option<String> = row.get(3)?;
        Ok((
            client_id,
            Communication {
                id: row.get(1)?,
                status: CommunicationStatus::from_str_lossy(&status),
                result: result.as_deref().map(CommunicationResult::from_str_lossy),
                reason: row.get(4)?,
                scheduled_at: row.get(5)?,
                closed_at: row.get(6)?,
                created_at: row.get(7)?,
            },
        ))
    })?;
    let mut by_client: std::collections::HashMap<String, Vec<Communication>> =
        std::collections::HashMap::new();
    for entry in comms {
        let (client_id, comm) = entry?;
        by_client.entry(client_id).or_default().push(comm);
    }
    for client in &mut clients {
        if let Some(comms) = by_client.remove(&client.id) {
            client.communications = comms;
        }
    }
    Ok(clients)
}

// ── Tasks ──────────────────────────────────────────────────────────

pub fn upsert_task(conn: &Connection, task: &Task) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO tasks (task_id, title, assignee_id, status, created_at, completed_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(task_id) DO UPDATE SET
            title=excluded.title, assignee_id=excluded.assignee_id, status=excluded.status,
            created_at=excluded.created_at, completed_at=excluded.completed_at,
            updated_at=excluded.updated_at",
        params![
            task.id,
            task.title,
            task.assignee_id,
            task.status,
            task.created_at,
            task.completed_at,
        ],
    )?;
    Ok(())
}

fn list_tasks(conn: &Connection) -> Result<Vec<Task>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT task_id, title, assignee_id, status, created_at, completed_at
         FROM tasks ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            assignee_id: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
            completed_at: row.get(5)?,
        })
    })?;
    rows.collect()
}

// ── Orders ─────────────────────────────────────────────────────────

pub fn upsert_order(conn: &Connection, order: &Order) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO orders (
            order_id, client_id, manager_id, delivery_method, status, created_at, amount, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
        ON CONFLICT(order_id) DO UPDATE SET
            client_id=excluded.client_id, manager_id=excluded.manager_id,
            delivery_method=excluded.delivery_method, status=excluded.status,
            created_at=excluded.created_at, amount=excluded.amount,
            updated_at=excluded.updated_at",
        params![
            order.id,
            order.client_id,
            order.manager_id,
            order.delivery_method,
            order.status,
            order.created_at,
            order.amount,
        ],
    )?;
    Ok(())
}

fn list_orders(conn: &Connection) -> Result<Vec<Order>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT order_id, client_id, manager_id, delivery_method, status, created_at, amount
         FROM orders ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Order {
            id: row.get(0)?,
            client_id: row.get(1)?,
            manager_id: row.get(2)?,
            delivery_method: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            amount: row.get(6)?,
        })
    })?;
    rows.collect()
}

// ── Snapshot ───────────────────────────────────────────────────────

/// Entity kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Employee,
    Client,
    Task,
    Order,
}

impl EntityKind {
    fn table_and_key(&self) -> (&'static str, &'static str) {
        match self {
            EntityKind::Employee => ("employees", "employee_id"),
            EntityKind::Client => ("clients", "client_id"),
            EntityKind::Task => ("tasks", "task_id"),
            EntityKind::Order => ("orders", "order_id"),
        }
    }
}

/// Delete one entity; returns whether a row was removed.
pub fn delete_entity(conn: &Connection, kind: EntityKind, id: &str) -> Result<bool, rusqlite::Error> {
    let (table, key) = kind.table_and_key();
    let n = conn.execute(&format!("DELETE FROM {table} WHERE {key} = ?1"), params![id])?;
    Ok(n > 0)
}

/// Upsert every entity of a snapshot. Each record is its own write; a
/// later record with the same id overwrites an earlier one.
pub fn import_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<usize, rusqlite::Error> {
    for e in &snapshot.employees {
        upsert_employee(conn, e)?;
    }
    for c in &snapshot.clients {
        upsert_client(conn, c)?;
    }
    for t in &snapshot.tasks {
        upsert_task(conn, t)?;
    }
    for o in &snapshot.orders {
        upsert_order(conn, o)?;
    }
    Ok(snapshot.employees.len() + snapshot.clients.len() + snapshot.tasks.len() + snapshot.orders.len())
}

/// Read the whole store in insertion order.
pub fn load_snapshot(conn: &Connection) -> Result<Snapshot, rusqlite::Error> {
    Ok(Snapshot {
        employees: list_employees(conn)?,
        clients: list_clients(conn)?,
        tasks: list_tasks(conn)?,
        orders: list_orders(conn)?,
    })
}

/// Row counts per entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct EntityCounts {
    pub employees: i64,
    pub clients: i64,
    pub communications: i64,
    pub tasks: i64,
    pub orders: i64,
}

pub fn count_entities(conn: &Connection) -> Result<EntityCounts, rusqlite::Error> {
    let count = |table: &str| -> Result<i64, rusqlite::Error> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
    };
    Ok(EntityCounts {
        employees: count("employees")?,
        clients: count("clients")?,
        communications: count("communications")?,
        tasks: count("tasks")?,
        orders: count("orders")?,
    })
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::test_support::*;

    fn sample() -> Snapshot {
        let mut c1 = client("c1", "m1", "2025-03-10T09:00:00");
        c1.communications = vec![
            refused("k1", "2025-03-11T09:00:00", "Price"),
            planned("k2", "2025-03-20T09:00:00"),
        ];
        let mut m2 = manager("m2", "Boris");
        m2.report_access = Some(ReportAccess {
            sales: false,
            ..ReportAccess::full()
        });
        Snapshot {
            employees: vec![manager("m1", "Anna"), m2],
            clients: vec![c1, client("c0", "m2", "2025-01-01")],
            tasks: vec![task("t1", Some("m1"), "completed"), task("t2", None, "new")],
            orders: vec![order("o1", Some("c1"), None, "2025-03-12T09:00:00")],
        }
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                set_config(conn, "unassigned_label", "Nobody")?;
                let val = get_config(conn, "unassigned_label")?;
                assert_eq!(val, Some("Nobody".to_string()));

                let missing = get_config(conn, "nonexistent")?;
                assert_eq!(missing, None);

                set_config(conn, "default_period", "month")?;
                assert_eq!(list_config(conn)?.len(), 2);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_preserves_order() {
        let db = Database::open_memory().await.unwrap();
        let snapshot = sample();
        let expected = snapshot.clone();

        let loaded = db
            .writer()
            .call(move |conn| {
                let n = import_snapshot(conn, &snapshot)?;
                assert_eq!(n, 7);
                load_snapshot(conn)
            })
            .await
            .unwrap();

        assert_eq!(loaded, expected);
    }

    #[tokio::test]
    async fn test_reimport_is_last_write_wins() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                import_snapshot(conn, &sample())?;

                let mut changed = sample();
                changed.clients[0].region = Some("South".into());
                changed.clients[0].communications.truncate(1);
                changed.tasks[1].assignee_id = Some("m2".into());
                import_snapshot(conn, &changed)?;

                let loaded = load_snapshot(conn)?;
                assert_eq!(loaded.clients.len(), 2);
                assert_eq!(loaded.clients[0].id, "c1");
                assert_eq!(loaded.clients[0].region.as_deref(), Some("South"));
                assert_eq!(loaded.clients[0].communications.len(), 1);
                assert_eq!(loaded.tasks[1].assignee_id.as_deref(), Some("m2"));

                let counts = count_entities(conn)?;
                assert_eq!(counts.communications, 1);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_client_cascades_communications() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                import_snapshot(conn, &sample())?;
                assert!(delete_entity(conn, EntityKind::Client, "c1")?);
                assert!(!delete_entity(conn, EntityKind::Client, "c1")?);

                let counts = count_entities(conn)?;
                assert_eq!(counts.clients, 1);
                assert_eq!(counts.communications, 0);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_count_entities() {
        let db = Database::open_memory().await.unwrap();

        let counts = db
            .writer()
            .call(|conn| {
                import_snapshot(conn, &sample())?;
                count_entities(conn)
            })
            .await
            .unwrap();

        assert_eq!(
            counts,
            EntityCounts {
                employees: 2,
                clients: 2,
                communications: 2,
                tasks: 2,
                orders: 1,
            }
        );
    }
}
