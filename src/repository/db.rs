//! Database Connection and Setup
//!
//! Manages the SQLite connection and versioned schema migrations.
//! The schema version lives in `PRAGMA user_version`; migrations only ever add
//! to an existing table and never drop rows.

use rusqlite::types::Value;
use rusqlite::{params, Connection, Transaction};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Schema version this build writes
pub const SCHEMA_VERSION: i32 = 3;

/// Name given to adopted rows that had none
const UNNAMED_ITEM: &str = "Unnamed item";

type Migration = fn(&Transaction<'_>) -> rusqlite::Result<()>;

/// Entry N upgrades a database from version N to N+1.
const MIGRATIONS: &[Migration] = &[
    create_or_adopt_items_table,
    create_status_index,
    enforce_item_values,
];

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Store(e.to_string())
    }
}

/// Database state wrapper
///
/// Starts empty so the app can be wired up before the database is opened;
/// calls made in that window fail with a store error.
#[derive(Clone)]
pub struct DbState {
    pub conn: Arc<Mutex<Option<Connection>>>,
    path: PathBuf,
}

impl DbState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared connection handle for repositories
    pub fn connection(&self) -> Arc<Mutex<Option<Connection>>> {
        Arc::clone(&self.conn)
    }

    pub async fn is_initialized(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Move the connection of a freshly initialized state into this one
    pub async fn adopt(&self, initialized: DbState) {
        let conn = initialized.conn.lock().await.take();
        *self.conn.lock().await = conn;
    }

    /// Drop the connection; later calls fail until a new one is adopted
    pub async fn close(&self) {
        self.conn.lock().await.take();
    }
}

/// Open the database at `db_path` (`:memory:` for a private in-memory one)
/// and bring its schema up to date.
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let mut conn = Connection::open(db_path)
        .map_err(|e| DomainError::Store(format!("Failed to open {}: {}", db_path.display(), e)))?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    run_migrations(&mut conn)?;

    let state = DbState::new(db_path.to_path_buf());
    *state.conn.lock().await = Some(conn);
    Ok(state)
}

fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Run database migrations
fn run_migrations(conn: &mut Connection) -> DomainResult<()> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DomainError::Store(format!(
            "Database schema v{} is newer than supported v{}",
            current, SCHEMA_VERSION
        )));
    }
    let start = usize::try_from(current)
        .map_err(|_| DomainError::Store(format!("Invalid schema version {}", current)))?;

    for (index, migrate) in MIGRATIONS.iter().enumerate().skip(start) {
        let target = index as i32 + 1;
        let tx = conn.transaction()?;
        migrate(&tx)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", target))?;
        tx.commit()?;
        log::info!("Migrated database schema to v{}", target);
    }

    Ok(())
}

/// Check if a table exists
fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// v1: items table. A table left by an earlier build (`qty` column, boolean
/// stored as text) is adopted in place.
fn create_or_adopt_items_table(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    if !table_exists(tx, "items")? {
        tx.execute_batch(
            "CREATE TABLE items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                quantity TEXT NOT NULL DEFAULT '',
                bought INTEGER NOT NULL DEFAULT 0,
                price INTEGER
            )",
        )?;
        return Ok(());
    }

    log::warn!("Adopting existing items table without schema version");

    if column_exists(tx, "items", "qty")? && !column_exists(tx, "items", "quantity")? {
        tx.execute_batch("ALTER TABLE items RENAME COLUMN qty TO quantity")?;
    }

    let additions = [
        ("name", "ALTER TABLE items ADD COLUMN name TEXT"),
        ("quantity", "ALTER TABLE items ADD COLUMN quantity TEXT NOT NULL DEFAULT ''"),
        ("bought", "ALTER TABLE items ADD COLUMN bought INTEGER NOT NULL DEFAULT 0"),
        ("price", "ALTER TABLE items ADD COLUMN price INTEGER"),
    ];
    for (column, ddl) in additions {
        if !column_exists(tx, "items", column)? {
            log::warn!("Adding missing column items.{}", column);
            tx.execute_batch(ddl)?;
        }
    }

    tx.execute_batch(
        "UPDATE items SET bought = CASE WHEN bought IN (1, '1', 'true') THEN 1 ELSE 0 END;
         UPDATE items SET quantity = '' WHERE quantity IS NULL;
         UPDATE items SET name = trim(name) WHERE name IS NOT NULL AND name != trim(name);",
    )
}

/// v2: index backing the per-status listing and sums
fn create_status_index(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch("CREATE INDEX IF NOT EXISTS idx_items_bought_id ON items(bought, id)")
}

/// v3: rows written by older builds may hold prices as text or reals and
/// repeated or blank names. Repair them, then let the store enforce unique
/// names.
fn enforce_item_values(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    repair_prices(tx)?;
    repair_names(tx)?;
    tx.execute_batch("CREATE UNIQUE INDEX IF NOT EXISTS idx_items_name ON items(name)")
}

fn repair_prices(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let rows: Vec<(i64, Value)> = tx
        .prepare(
            "SELECT id, price FROM items
             WHERE typeof(price) NOT IN ('integer', 'null') OR price < 0 OR price > 4294967295",
        )?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    for (id, raw) in rows {
        let price = legacy_price(&raw);
        if price.is_none() {
            log::warn!("Clearing unreadable price of item {}: {:?}", id, raw);
        }
        tx.execute("UPDATE items SET price = ?1 WHERE id = ?2", params![price, id])?;
    }
    Ok(())
}

/// Whole units from a stored price. Decimals round half away from zero;
/// blank, negative or non-numeric values become no price.
fn legacy_price(raw: &Value) -> Option<i64> {
    let amount = match raw {
        Value::Integer(n) => *n as f64,
        Value::Real(f) => *f,
        Value::Text(text) => text.trim().parse::<f64>().ok()?,
        Value::Null | Value::Blob(_) => return None,
    };
    let rounded = amount.round();
    if !rounded.is_finite() || rounded < 0.0 || rounded > f64::from(u32::MAX) {
        return None;
    }
    Some(rounded as i64)
}

/// Trim names, name blank rows and suffix repeats with ` (2)`, ` (3)`, ...
/// The lowest id keeps the plain name.
fn repair_names(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let rows: Vec<(i64, Option<String>)> = tx
        .prepare("SELECT id, name FROM items ORDER BY id")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    let mut taken = HashSet::new();
    for (id, stored) in rows {
        let base = match stored.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNNAMED_ITEM.to_string(),
        };
        let mut name = base.clone();
        let mut n = 2;
        while taken.contains(&name) {
            name = format!("{} ({})", base, n);
            n += 1;
        }

        if stored.as_deref() != Some(name.as_str()) {
            log::warn!("Renaming adopted item {} to '{}'", id, name);
            tx.execute("UPDATE items SET name = ?1 WHERE id = ?2", params![name, id])?;
        }
        taken.insert(name);
    }
    Ok(())
}
