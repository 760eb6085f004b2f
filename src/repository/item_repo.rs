//! Item Repository Implementation
//!
//! SQLite-backed implementation of `GroceryRepository`.
//! Every mutation runs its check, write and read-back in one transaction.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::traits::GroceryRepository;
use crate::domain::{assign_display_indices, DomainError, DomainResult, Item, ItemDraft};

const SELECT_ITEM: &str = "SELECT id, name, quantity, price, bought FROM items";

/// SQLite implementation of Item repository
#[derive(Clone)]
pub struct ItemRepository {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl ItemRepository {
    pub fn new(conn: Arc<Mutex<Option<Connection>>>) -> Self {
        Self { conn }
    }

    /// Lock the connection for one unit of work
    async fn with_conn<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&mut Connection) -> DomainResult<T> + Send,
        T: Send,
    {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| DomainError::Store("Database not initialized".to_string()))?;
        f(conn)
    }
}

#[async_trait]
impl GroceryRepository for ItemRepository {
    async fn create(&self, draft: &ItemDraft) -> DomainResult<Item> {
        let draft = draft.validated()?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            if name_taken(&tx, &draft.name, None)? {
                return Err(DomainError::DuplicateName(draft.name));
            }

            tx.execute(
                "INSERT INTO items (name, quantity, bought, price) VALUES (?1, ?2, 0, ?3)",
                params![draft.name, draft.quantity, draft.price],
            )?;
            let id = row_id(tx.last_insert_rowid())?;
            tx.commit()?;

            log::debug!("Created item {} '{}'", id, draft.name);
            Ok(Item::new(id, draft.name, draft.quantity, draft.price))
        })
        .await
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Item>> {
        self.with_conn(|conn| fetch_item(conn, id)).await
    }

    async fn rename(&self, id: u32, draft: &ItemDraft) -> DomainResult<Item> {
        let draft = draft.validated()?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            if name_taken(&tx, &draft.name, Some(id))? {
                return Err(DomainError::DuplicateName(draft.name));
            }

            let affected = tx.execute(
                "UPDATE items SET name = ?1, quantity = ?2, price = ?3 WHERE id = ?4",
                params![draft.name, draft.quantity, draft.price, id],
            )?;
            if affected == 0 {
                return Err(DomainError::NotFound(id));
            }

            let item = fetch_item(&tx, id)?.ok_or(DomainError::NotFound(id))?;
            tx.commit()?;

            log::debug!("Updated item {} '{}'", id, item.name);
            Ok(item)
        })
        .await
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
            if affected == 0 {
                return Err(DomainError::NotFound(id));
            }
            log::debug!("Deleted item {}", id);
            Ok(())
        })
        .await
    }

    async fn toggle_bought(&self, id: u32) -> DomainResult<Item> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let affected = tx.execute(
                "UPDATE items SET bought = CASE WHEN bought = 0 THEN 1 ELSE 0 END WHERE id = ?1",
                params![id],
            )?;
            if affected == 0 {
                return Err(DomainError::NotFound(id));
            }

            let item = fetch_item(&tx, id)?.ok_or(DomainError::NotFound(id))?;
            tx.commit()?;

            log::debug!("Item {} bought = {}", id, item.bought);
            Ok(item)
        })
        .await
    }

    async fn list_by_status(&self, bought: bool) -> DomainResult<Vec<Item>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE bought = ?1 ORDER BY id ASC", SELECT_ITEM))?;
            let rows = stmt.query_map(params![bought], row_to_item)?;
            let mut items = rows.collect::<rusqlite::Result<Vec<Item>>>()?;
            assign_display_indices(&mut items);
            Ok(items)
        })
        .await
    }

    async fn sum_price(&self, bought: bool) -> DomainResult<u64> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(price), 0) FROM items WHERE bought = ?1",
                params![bought],
                |row| row.get(0),
            )?;
            u64::try_from(total)
                .map_err(|_| DomainError::Store(format!("Negative price total {}", total)))
        })
        .await
    }
}

/// Name comparison is exact (BINARY collation), optionally ignoring one id
fn name_taken(conn: &Connection, name: &str, except_id: Option<u32>) -> DomainResult<bool> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE name = ?1 AND id IS NOT ?2)",
        params![name, except_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn fetch_item(conn: &Connection, id: u32) -> DomainResult<Option<Item>> {
    let item = conn
        .query_row(&format!("{} WHERE id = ?1", SELECT_ITEM), params![id], row_to_item)
        .optional()?;
    Ok(item)
}

fn row_id(rowid: i64) -> DomainResult<u32> {
    u32::try_from(rowid).map_err(|_| DomainError::Store(format!("Row id {} out of range", rowid)))
}

/// Convert a database row to Item
fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        quantity: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        price: row.get(3)?,
        bought: row.get::<_, i64>(4)? != 0,
        display_index: 0,
    })
}
