//! DuckDB relational store for signed-in users

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    new_id, Budget, BudgetPatch, Entity, EntityKind, Expense, ExpensePatch, Hub, InventoryItem,
    InventoryItemPatch, MoveDetails, MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask,
    NewTimelineEvent, Task, TaskPatch, TimelineEvent, TimelineEventPatch,
};
use crate::ports::{MoveDataProvider, StorageMode, WorkspaceDirectory};
use crate::services::schema::{SchemaMigrationResult, SchemaService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// A collection record that maps onto one table row
trait TableRecord: Entity {
    /// Select list, in the order `from_row` reads it
    const COLUMNS: &'static str;
    const ORDER_BY: &'static str;

    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self>;

    fn insert(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize>;

    fn write_back(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize>;
}

/// Owner of the DuckDB connection
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open a database file and bring its schema up to date
    ///
    /// Retries with exponential backoff when another process holds the
    /// file lock, which happens when two CLI invocations overlap.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// A throwaway database with the full schema
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is linked in statically
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<SchemaMigrationResult> {
        let conn = self.conn()?;
        SchemaService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("{:#}", e)))
    }

    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::debug!(applied = ?result.applied, "applied schema migrations");
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::lock_poisoned("duckdb connection"))
    }

    // === Collections ===

    fn list<T: TableRecord>(&self, hub_id: &str) -> Result<Vec<T>> {
        let conn = self.conn()?;
        select_records(&conn, hub_id, None)
    }

    fn insert<T: TableRecord>(&self, hub_id: &str, draft: T::Draft) -> Result<T> {
        let mut record = T::from_draft(new_id(), draft);
        record.normalize_money()?;
        let conn = self.conn()?;
        record.insert(&conn, hub_id)?;
        tracing::debug!(kind = %T::KIND, hub_id, id = record.id(), "inserted row");
        Ok(record)
    }

    /// Read the row, merge the patch with the domain rules, write it back
    fn update<T: TableRecord>(&self, hub_id: &str, id: &str, patch: T::Patch) -> Result<bool> {
        let conn = self.conn()?;
        let Some(mut record) = select_records::<T>(&conn, hub_id, Some(id))?.pop() else {
            return Ok(false);
        };
        record.apply(patch);
        record.normalize_money()?;
        Ok(record.write_back(&conn, hub_id)? > 0)
    }

    fn delete<T: TableRecord>(&self, hub_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM {} WHERE hub_id = ? AND id = ?",
            T::KIND.table_name()
        );
        let rows = conn.execute(&sql, params![hub_id, id])?;
        Ok(rows > 0)
    }

    /// Count of rows of `kind` in a hub
    pub fn count(&self, kind: EntityKind, hub_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE hub_id = ?", kind.table_name());
        Ok(conn.query_row(&sql, [hub_id], |row| row.get(0))?)
    }

    // === Singletons ===

    pub fn get_budget(&self, hub_id: &str) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        select_budget(&conn, hub_id)
    }

    pub fn save_budget(&self, hub_id: &str, patch: BudgetPatch) -> Result<Budget> {
        let conn = self.conn()?;
        let existing = select_budget(&conn, hub_id)?;
        let exists = existing.is_some();
        let mut budget = Budget::merge(existing, patch);
        budget.normalize_money()?;

        let categories = budget
            .category_budgets
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now().to_rfc3339();

        if exists {
            conn.execute(
                "UPDATE budgets SET total_budget = CAST(? AS DECIMAL(14, 2)),
                                    category_budgets = ?, updated_at = ?
                 WHERE hub_id = ?",
                params![budget.total_budget.to_string(), categories, now, hub_id],
            )?;
        } else {
            conn.execute(
                "INSERT INTO budgets (hub_id, total_budget, category_budgets, updated_at)
                 VALUES (?, CAST(? AS DECIMAL(14, 2)), ?, ?)",
                params![hub_id, budget.total_budget.to_string(), categories, now],
            )?;
        }
        Ok(budget)
    }

    pub fn get_move_details(&self, hub_id: &str) -> Result<Option<MoveDetails>> {
        let conn = self.conn()?;
        select_move_details(&conn, hub_id)
    }

    pub fn save_move_details(&self, hub_id: &str, patch: MoveDetailsPatch) -> Result<MoveDetails> {
        let conn = self.conn()?;
        let existing = select_move_details(&conn, hub_id)?;
        let exists = existing.is_some();
        let details = MoveDetails::merge(existing, patch, Utc::now());

        let move_date = details.move_date.map(|d| d.to_string());
        let now = Utc::now().to_rfc3339();

        if exists {
            // created_date is never rewritten
            conn.execute(
                "UPDATE move_details SET current_address = ?, new_address = ?,
                                         move_date = CAST(? AS DATE), updated_at = ?
                 WHERE hub_id = ?",
                params![
                    details.current_address,
                    details.new_address,
                    move_date,
                    now,
                    hub_id
                ],
            )?;
        } else {
            conn.execute(
                "INSERT INTO move_details (hub_id, current_address, new_address, move_date,
                                           created_date, updated_at)
                 VALUES (?, ?, ?, CAST(? AS DATE), ?, ?)",
                params![
                    hub_id,
                    details.current_address,
                    details.new_address,
                    move_date,
                    details.created_date.to_rfc3339(),
                    now
                ],
            )?;
        }
        Ok(details)
    }

    // === Hubs ===

    pub fn create_hub(&self, name: &str, owner_id: &str) -> Result<Hub> {
        let hub = Hub {
            id: new_id(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        };
        let created = hub.created_at.to_rfc3339();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO hubs (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)",
            params![hub.id, hub.name, hub.owner_id, created],
        )?;
        tx.execute(
            "INSERT INTO hub_members (hub_id, user_id, role, joined_at) VALUES (?, ?, 'owner', ?)",
            params![hub.id, hub.owner_id, created],
        )?;
        tx.commit()?;

        tracing::debug!(hub_id = %hub.id, "created hub");
        Ok(hub)
    }

    pub fn hub_for_user(&self, user_id: &str) -> Result<Option<Hub>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT h.id, h.name, h.owner_id, h.created_at
             FROM hubs h JOIN hub_members m ON m.hub_id = h.id
             WHERE m.user_id = ?
             ORDER BY m.joined_at
             LIMIT 1",
        )?;
        let hub = stmt
            .query_map([user_id], |row| {
                let created: String = row.get(3)?;
                Ok(Hub {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    created_at: parse_timestamp(3, &created)?,
                })
            })?
            .next()
            .transpose()?;
        Ok(hub)
    }
}

fn select_records<T: TableRecord>(
    conn: &Connection,
    hub_id: &str,
    id: Option<&str>,
) -> Result<Vec<T>> {
    let table = T::KIND.table_name();
    let records = match id {
        Some(id) => {
            let sql = format!(
                "SELECT {} FROM {} WHERE hub_id = ? AND id = ?",
                T::COLUMNS,
                table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![hub_id, id], |row| T::from_row(row))?;
            rows.collect::<duckdb::Result<Vec<T>>>()?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM {} WHERE hub_id = ? ORDER BY {}",
                T::COLUMNS,
                table,
                T::ORDER_BY
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![hub_id], |row| T::from_row(row))?;
            rows.collect::<duckdb::Result<Vec<T>>>()?
        }
    };
    Ok(records)
}

fn select_budget(conn: &Connection, hub_id: &str) -> Result<Option<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT total_budget::VARCHAR, category_budgets FROM budgets WHERE hub_id = ?",
    )?;
    let budget = stmt
        .query_map([hub_id], |row| {
            let total: String = row.get(0)?;
            let categories: Option<String> = row.get(1)?;
            Ok(Budget {
                total_budget: parse_decimal(0, &total)?,
                category_budgets: categories
                    .map(|raw| {
                        serde_json::from_str::<BTreeMap<String, Decimal>>(&raw)
                            .map_err(|e| corrupt(1, e))
                    })
                    .transpose()?,
            })
        })?
        .next()
        .transpose()?;
    Ok(budget)
}

fn select_move_details(conn: &Connection, hub_id: &str) -> Result<Option<MoveDetails>> {
    let mut stmt = conn.prepare(
        "SELECT current_address, new_address, move_date::VARCHAR, created_date
         FROM move_details WHERE hub_id = ?",
    )?;
    let details = stmt
        .query_map([hub_id], |row| {
            let move_date: Option<String> = row.get(2)?;
            let created: String = row.get(3)?;
            Ok(MoveDetails {
                current_address: row.get(0)?,
                new_address: row.get(1)?,
                move_date: move_date.as_deref().map(|s| parse_date(2, s)).transpose()?,
                created_date: parse_timestamp(3, &created)?,
            })
        })?
        .next()
        .transpose()?;
    Ok(details)
}

// === Row mapping ===

impl TableRecord for Task {
    const COLUMNS: &'static str = "id, title, description, status, priority, category,
        due_date::VARCHAR, completed_date, cost::VARCHAR";
    const ORDER_BY: &'static str = "seq";

    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        let status: String = row.get(3)?;
        let priority: String = row.get(4)?;
        let due_date: Option<String> = row.get(6)?;
        let completed: Option<String> = row.get(7)?;
        let cost: Option<String> = row.get(8)?;

        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: parse_label(3, &status)?,
            priority: parse_label(4, &priority)?,
            category: row.get(5)?,
            due_date: due_date.as_deref().map(|s| parse_date(6, s)).transpose()?,
            completed_date: completed.as_deref().map(|s| parse_timestamp(7, s)).transpose()?,
            cost: cost.as_deref().map(|s| parse_decimal(8, s)).transpose()?,
        })
    }

    fn insert(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "INSERT INTO tasks (id, hub_id, title, description, status, priority, category,
                                due_date, completed_date, cost)
             VALUES (?, ?, ?, ?, ?, ?, ?, CAST(? AS DATE), ?, CAST(? AS DECIMAL(14, 2)))",
            params![
                self.id,
                hub_id,
                self.title,
                self.description,
                self.status.as_str(),
                self.priority.as_str(),
                self.category,
                self.due_date.map(|d| d.to_string()),
                self.completed_date.map(|d| d.to_rfc3339()),
                self.cost.map(|c| c.to_string()),
            ],
        )
    }

    fn write_back(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, category = ?,
                              due_date = CAST(? AS DATE), completed_date = ?,
                              cost = CAST(? AS DECIMAL(14, 2))
             WHERE hub_id = ? AND id = ?",
            params![
                self.title,
                self.description,
                self.status.as_str(),
                self.priority.as_str(),
                self.category,
                self.due_date.map(|d| d.to_string()),
                self.completed_date.map(|d| d.to_rfc3339()),
                self.cost.map(|c| c.to_string()),
                hub_id,
                self.id,
            ],
        )
    }
}

impl TableRecord for Expense {
    const COLUMNS: &'static str =
        "id, description, amount::VARCHAR, category, expense_date::VARCHAR, vendor";
    const ORDER_BY: &'static str = "expense_date DESC, seq";

    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        let amount: String = row.get(2)?;
        let date: String = row.get(4)?;

        Ok(Expense {
            id: row.get(0)?,
            description: row.get(1)?,
            amount: parse_decimal(2, &amount)?,
            category: row.get(3)?,
            date: parse_date(4, &date)?,
            vendor: row.get(5)?,
        })
    }

    fn insert(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "INSERT INTO expenses (id, hub_id, description, amount, category, expense_date, vendor)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(14, 2)), ?, CAST(? AS DATE), ?)",
            params![
                self.id,
                hub_id,
                self.description,
                self.amount.to_string(),
                self.category,
                self.date.to_string(),
                self.vendor,
            ],
        )
    }

    fn write_back(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "UPDATE expenses SET description = ?, amount = CAST(? AS DECIMAL(14, 2)), category = ?,
                                 expense_date = CAST(? AS DATE), vendor = ?
             WHERE hub_id = ? AND id = ?",
            params![
                self.description,
                self.amount.to_string(),
                self.category,
                self.date.to_string(),
                self.vendor,
                hub_id,
                self.id,
            ],
        )
    }
}

impl TableRecord for TimelineEvent {
    const COLUMNS: &'static str = "id, title, event_date::VARCHAR, event_type, notes";
    const ORDER_BY: &'static str = "event_date ASC, seq";

    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        let date: String = row.get(2)?;

        Ok(TimelineEvent {
            id: row.get(0)?,
            title: row.get(1)?,
            date: parse_date(2, &date)?,
            event_type: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    fn insert(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "INSERT INTO timeline_events (id, hub_id, title, event_date, event_type, notes)
             VALUES (?, ?, ?, CAST(? AS DATE), ?, ?)",
            params![
                self.id,
                hub_id,
                self.title,
                self.date.to_string(),
                self.event_type,
                self.notes,
            ],
        )
    }

    fn write_back(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "UPDATE timeline_events SET title = ?, event_date = CAST(? AS DATE), event_type = ?,
                                        notes = ?
             WHERE hub_id = ? AND id = ?",
            params![
                self.title,
                self.date.to_string(),
                self.event_type,
                self.notes,
                hub_id,
                self.id,
            ],
        )
    }
}

impl TableRecord for InventoryItem {
    const COLUMNS: &'static str = "id, name, room, disposition, box_label, value::VARCHAR, sold,
        sold_amount::VARCHAR";
    const ORDER_BY: &'static str = "seq";

    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        let disposition: String = row.get(3)?;
        let value: Option<String> = row.get(5)?;
        let sold_amount: Option<String> = row.get(7)?;

        Ok(InventoryItem {
            id: row.get(0)?,
            name: row.get(1)?,
            room: row.get(2)?,
            disposition: parse_label(3, &disposition)?,
            box_label: row.get(4)?,
            value: value.as_deref().map(|s| parse_decimal(5, s)).transpose()?,
            sold: row.get(6)?,
            sold_amount: sold_amount.as_deref().map(|s| parse_decimal(7, s)).transpose()?,
        })
    }

    fn insert(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "INSERT INTO inventory_items (id, hub_id, name, room, disposition, box_label, value,
                                          sold, sold_amount)
             VALUES (?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(14, 2)), ?, CAST(? AS DECIMAL(14, 2)))",
            params![
                self.id,
                hub_id,
                self.name,
                self.room,
                self.disposition.as_str(),
                self.box_label,
                self.value.map(|v| v.to_string()),
                self.sold,
                self.sold_amount.map(|v| v.to_string()),
            ],
        )
    }

    fn write_back(&self, conn: &Connection, hub_id: &str) -> duckdb::Result<usize> {
        conn.execute(
            "UPDATE inventory_items SET name = ?, room = ?, disposition = ?, box_label = ?,
                                        value = CAST(? AS DECIMAL(14, 2)), sold = ?,
                                        sold_amount = CAST(? AS DECIMAL(14, 2))
             WHERE hub_id = ? AND id = ?",
            params![
                self.name,
                self.room,
                self.disposition.as_str(),
                self.box_label,
                self.value.map(|v| v.to_string()),
                self.sold,
                self.sold_amount.map(|v| v.to_string()),
                hub_id,
                self.id,
            ],
        )
    }
}

// Helper functions. A column that does not parse back is reported as a
// conversion failure, which surfaces as `Error::Storage`.

fn corrupt<E>(col: usize, err: E) -> duckdb::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    duckdb::Error::FromSqlConversionFailure(col, Type::Text, Box::new(err))
}

fn parse_timestamp(col: usize, s: &str) -> duckdb::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(col, e))
}

fn parse_date(col: usize, s: &str) -> duckdb::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| corrupt(col, e))
}

fn parse_decimal(col: usize, s: &str) -> duckdb::Result<Decimal> {
    Decimal::from_str_exact(s.trim()).map_err(|e| corrupt(col, e))
}

/// Status, priority and disposition labels
fn parse_label<T: FromStr<Err = Error>>(col: usize, s: &str) -> duckdb::Result<T> {
    s.parse().map_err(|e| corrupt(col, e))
}

#[async_trait]
impl WorkspaceDirectory for DuckDbStore {
    async fn create_hub(&self, name: &str, owner_id: &str) -> Result<Hub> {
        DuckDbStore::create_hub(self, name, owner_id)
    }

    async fn hub_for_user(&self, user_id: &str) -> Result<Option<Hub>> {
        DuckDbStore::hub_for_user(self, user_id)
    }
}

/// [`MoveDataProvider`] over a shared [`DuckDbStore`]
///
/// Queries run on the blocking pool so a slow statement never stalls the
/// async runtime.
#[derive(Clone)]
pub struct DuckDbDataProvider {
    store: Arc<DuckDbStore>,
}

impl DuckDbDataProvider {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DuckDbStore> {
        &self.store
    }

    async fn run_blocking<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&DuckDbStore) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| Error::database(format!("Task execution failed: {}", e)))?
    }
}

#[async_trait]
impl MoveDataProvider for DuckDbDataProvider {
    fn mode(&self) -> StorageMode {
        StorageMode::Database
    }

    async fn list_tasks(&self, hub_id: &str) -> Result<Vec<Task>> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.list(&hub_id)).await
    }

    async fn add_task(&self, hub_id: &str, task: NewTask) -> Result<Task> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.insert::<Task>(&hub_id, task)).await
    }

    async fn update_task(&self, hub_id: &str, id: &str, patch: TaskPatch) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.update::<Task>(&hub_id, &id, patch))
            .await
    }

    async fn delete_task(&self, hub_id: &str, id: &str) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.delete::<Task>(&hub_id, &id)).await
    }

    async fn list_expenses(&self, hub_id: &str) -> Result<Vec<Expense>> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.list(&hub_id)).await
    }

    async fn add_expense(&self, hub_id: &str, expense: NewExpense) -> Result<Expense> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.insert::<Expense>(&hub_id, expense))
            .await
    }

    async fn update_expense(&self, hub_id: &str, id: &str, patch: ExpensePatch) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.update::<Expense>(&hub_id, &id, patch))
            .await
    }

    async fn delete_expense(&self, hub_id: &str, id: &str) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.delete::<Expense>(&hub_id, &id))
            .await
    }

    async fn list_timeline_events(&self, hub_id: &str) -> Result<Vec<TimelineEvent>> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.list(&hub_id)).await
    }

    async fn add_timeline_event(
        &self,
        hub_id: &str,
        event: NewTimelineEvent,
    ) -> Result<TimelineEvent> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.insert::<TimelineEvent>(&hub_id, event))
            .await
    }

    async fn update_timeline_event(
        &self,
        hub_id: &str,
        id: &str,
        patch: TimelineEventPatch,
    ) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.update::<TimelineEvent>(&hub_id, &id, patch))
            .await
    }

    async fn delete_timeline_event(&self, hub_id: &str, id: &str) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.delete::<TimelineEvent>(&hub_id, &id))
            .await
    }

    async fn list_inventory_items(&self, hub_id: &str) -> Result<Vec<InventoryItem>> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.list(&hub_id)).await
    }

    async fn add_inventory_item(
        &self,
        hub_id: &str,
        item: NewInventoryItem,
    ) -> Result<InventoryItem> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.insert::<InventoryItem>(&hub_id, item))
            .await
    }

    async fn update_inventory_item(
        &self,
        hub_id: &str,
        id: &str,
        patch: InventoryItemPatch,
    ) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.update::<InventoryItem>(&hub_id, &id, patch))
            .await
    }

    async fn delete_inventory_item(&self, hub_id: &str, id: &str) -> Result<bool> {
        let (hub_id, id) = (hub_id.to_string(), id.to_string());
        self.run_blocking(move |s| s.delete::<InventoryItem>(&hub_id, &id))
            .await
    }

    async fn get_budget(&self, hub_id: &str) -> Result<Option<Budget>> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.get_budget(&hub_id)).await
    }

    async fn save_budget(&self, hub_id: &str, patch: BudgetPatch) -> Result<Budget> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.save_budget(&hub_id, patch)).await
    }

    async fn get_move_details(&self, hub_id: &str) -> Result<Option<MoveDetails>> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.get_move_details(&hub_id)).await
    }

    async fn save_move_details(&self, hub_id: &str, patch: MoveDetailsPatch) -> Result<MoveDetails> {
        let hub_id = hub_id.to_string();
        self.run_blocking(move |s| s.save_move_details(&hub_id, patch))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Disposition, TaskPriority, TaskStatus};
    use crate::ports::ReadFallback;

    fn provider() -> DuckDbDataProvider {
        DuckDbDataProvider::new(Arc::new(DuckDbStore::open_in_memory().unwrap()))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("database is locked"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_decimal(0, "12.50").unwrap(), Decimal::new(1250, 2));
        assert!(parse_decimal(0, "garbage").is_err());
        assert_eq!(parse_date(0, "2024-06-03").unwrap(), day(3));
        assert!(parse_date(0, "").is_err());
        assert!(parse_timestamp(0, "yesterday").is_err());
        assert!(parse_label::<TaskStatus>(0, "someday").is_err());
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_storage_errors() {
        let provider = provider();
        let task = provider.add_task("h1", NewTask::new("Pack boxes")).await.unwrap();
        provider
            .save_move_details("h1", MoveDetailsPatch::default())
            .await
            .unwrap();
        {
            let conn = provider.store().conn().unwrap();
            conn.execute("UPDATE tasks SET status = 'someday' WHERE id = ?", params![task.id])
                .unwrap();
            conn.execute(
                "UPDATE move_details SET created_date = 'not a time' WHERE hub_id = 'h1'",
                [],
            )
            .unwrap();
        }

        assert!(matches!(provider.list_tasks("h1").await, Err(Error::Storage(_))));
        assert!(matches!(
            provider.get_move_details("h1").await,
            Err(Error::Storage(_))
        ));
        // The lenient reads downgrade it
        assert!(provider.tasks_or_empty("h1").await.is_empty());
        assert!(provider.move_details_or_none("h1").await.is_none());
        // Updates see the corrupt row too instead of rewriting it
        assert!(provider
            .update_task("h1", &task.id, TaskPatch::status(TaskStatus::Completed))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_task_round_trip() {
        let provider = provider();
        let task = provider
            .add_task(
                "h1",
                NewTask::new("Pack boxes")
                    .with_priority(TaskPriority::High)
                    .with_due_date(day(20))
                    .with_cost(Decimal::new(4999, 2))
                    .with_description("Kitchen first"),
            )
            .await
            .unwrap();

        let tasks = provider.list_tasks("h1").await.unwrap();
        assert_eq!(tasks, vec![task.clone()]);

        assert!(provider
            .update_task("h1", &task.id, TaskPatch::status(TaskStatus::Completed))
            .await
            .unwrap());
        let done = provider.list_tasks("h1").await.unwrap().remove(0);
        assert!(done.completed_date.is_some());
        assert_eq!(done.title, "Pack boxes");
        assert_eq!(done.cost, Some(Decimal::new(4999, 2)));

        provider
            .update_task("h1", &task.id, TaskPatch::status(TaskStatus::InProgress))
            .await
            .unwrap();
        let reopened = provider.list_tasks("h1").await.unwrap().remove(0);
        assert!(reopened.completed_date.is_none());
    }

    #[tokio::test]
    async fn test_mutations_scoped_by_hub() {
        let provider = provider();
        let task = provider.add_task("hub-1", NewTask::new("A")).await.unwrap();

        assert!(!provider
            .update_task("hub-2", &task.id, TaskPatch::status(TaskStatus::Cancelled))
            .await
            .unwrap());
        assert!(!provider.delete_task("hub-2", &task.id).await.unwrap());
        assert!(provider.list_tasks("hub-2").await.unwrap().is_empty());
        assert_eq!(provider.list_tasks("hub-1").await.unwrap().len(), 1);

        assert!(provider.delete_task("hub-1", &task.id).await.unwrap());
        assert!(!provider.delete_task("hub-1", &task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sql_ordering() {
        let provider = provider();
        for (label, d) in [("mid", 10), ("late", 20), ("early", 1)] {
            provider
                .add_expense("h1", NewExpense::new(label, Decimal::new(1050, 2), "misc", day(d)))
                .await
                .unwrap();
            provider
                .add_timeline_event("h1", NewTimelineEvent::new(label, day(d), "milestone"))
                .await
                .unwrap();
        }

        let expenses: Vec<String> = provider
            .list_expenses("h1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(expenses, vec!["late", "mid", "early"]);

        let events: Vec<String> = provider
            .list_timeline_events("h1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(events, vec!["early", "mid", "late"]);
    }

    #[tokio::test]
    async fn test_inventory_sale_fields() {
        let provider = provider();
        let mut draft = NewInventoryItem::new("Couch", "Living room")
            .with_disposition(Disposition::Sell)
            .with_box("LR-1");
        draft.sold = Some(true);
        draft.sold_amount = Some(Decimal::new(150, 0));
        let item = provider.add_inventory_item("h1", draft).await.unwrap();

        let stored = provider.list_inventory_items("h1").await.unwrap().remove(0);
        assert_eq!(stored, item);

        provider
            .update_inventory_item(
                "h1",
                &item.id,
                InventoryItemPatch {
                    disposition: Some(Disposition::Donate),
                    ..InventoryItemPatch::default()
                },
            )
            .await
            .unwrap();
        let stored = provider.list_inventory_items("h1").await.unwrap().remove(0);
        assert_eq!(stored.sold, None);
        assert_eq!(stored.sold_amount, None);
        assert_eq!(stored.box_label.as_deref(), Some("LR-1"));
    }

    #[tokio::test]
    async fn test_singletons_upsert() {
        let provider = provider();
        assert!(provider.get_budget("h1").await.unwrap().is_none());

        let mut categories = BTreeMap::new();
        categories.insert("movers".to_string(), Decimal::new(1200, 0));
        provider
            .save_budget(
                "h1",
                BudgetPatch {
                    total_budget: Some(Decimal::new(5000, 0)),
                    category_budgets: Some(Some(categories)),
                },
            )
            .await
            .unwrap();
        let budget = provider
            .save_budget("h1", BudgetPatch::total(Decimal::new(6000, 0)))
            .await
            .unwrap();
        assert_eq!(provider.get_budget("h1").await.unwrap(), Some(budget));
        assert_eq!(
            provider.store().count(EntityKind::Budget, "h1").unwrap(),
            1
        );

        let first = provider
            .save_move_details(
                "h1",
                MoveDetailsPatch {
                    move_date: Some(Some(day(30))),
                    ..MoveDetailsPatch::default()
                },
            )
            .await
            .unwrap();
        let second = provider
            .save_move_details(
                "h1",
                MoveDetailsPatch {
                    new_address: Some("12 Elm St".to_string()),
                    created_date: Some(Utc::now() + chrono::Duration::days(5)),
                    ..MoveDetailsPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.created_date, first.created_date);
        assert_eq!(second.move_date, Some(day(30)));

        let stored = provider.get_move_details("h1").await.unwrap().unwrap();
        assert_eq!(stored.new_address, "12 Elm St");
        assert_eq!(stored.move_date, Some(day(30)));
    }

    #[tokio::test]
    async fn test_hub_directory() {
        let store = DuckDbStore::open_in_memory().unwrap();
        assert!(store.hub_for_user("user-1").unwrap().is_none());

        let hub = WorkspaceDirectory::create_hub(&store, "My Move", "user-1")
            .await
            .unwrap();
        assert_eq!(hub.owner_id, "user-1");
        assert!(!hub.is_guest());

        let found = WorkspaceDirectory::hub_for_user(&store, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, hub.id);
        assert_eq!(found.name, "My Move");
    }
}
