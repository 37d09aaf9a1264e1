use rusqlite::{params, params_from_iter, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::category;
use crate::database::pool::{get_conn, DbPool};
use crate::database::query::{ItemFilter, MatchMode, SELECT_ITEMS};
use crate::error::{Result, StoreError};

pub type ItemId = i64;

/// A submission, as handed over by the caller after boundary validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    /// Content-addressed image filename, or empty when no image was uploaded.
    pub image_filename: String,
}

/// A stored item with its category resolved to a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub image_filename: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Items {
    pub items: Vec<Item>,
}

/// Item store over an owned connection pool.
///
/// Cloning is cheap and every call checks out its own connection, so one
/// repository can be shared across worker threads.
#[derive(Clone)]
pub struct ItemRepository {
    pool: DbPool,
    match_mode: MatchMode,
}

impl ItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            match_mode: MatchMode::default(),
        }
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Insert an item, creating its category on first use.
    ///
    /// Category resolution and the item insert share one transaction; if
    /// anything fails the transaction is dropped uncommitted.
    pub fn add(&self, item: &NewItem) -> Result<ItemId> {
        let mut conn = get_conn(&self.pool)?;
        // IMMEDIATE takes the write lock up front, before the category read.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let category_id = category::resolve(&tx, &item.category)?;

        let item_id: ItemId = {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO items (name, category_id, image_filename) VALUES (?1, ?2, ?3)
                 RETURNING id",
            )?;
            stmt.query_row(
                params![item.name, category_id, item.image_filename],
                |row| row.get(0),
            )?
        };

        tx.commit()?;
        debug!(
            "Stored item {} ({:?} in category {})",
            item_id, item.name, category_id
        );
        Ok(item_id)
    }

    pub fn get_by_id(&self, id: ItemId) -> Result<Item> {
        let conn = get_conn(&self.pool)?;
        let sql = format!("{} WHERE items.id = ?1", SELECT_ITEMS);
        let mut stmt = conn.prepare_cached(&sql)?;

        let item = stmt.query_row(params![id], parse_item_row).optional()?;
        item.ok_or_else(|| StoreError::not_found(format!("No item with id {}", id)))
    }

    /// Items matching `filter`, in insertion order. No match is an empty list.
    pub fn list(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let conn = get_conn(&self.pool)?;
        let (sql, bound) = filter.to_sql();
        let mut stmt = conn.prepare_cached(&sql)?;

        let items = stmt
            .query_map(params_from_iter(bound.iter()), parse_item_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn list_all(&self) -> Result<Vec<Item>> {
        self.list(&ItemFilter::All)
    }

    pub fn search(&self, keyword: &str) -> Result<Vec<Item>> {
        self.list(&ItemFilter::keyword(keyword, self.match_mode))
    }

    pub fn count(&self) -> Result<i64> {
        let conn = get_conn(&self.pool)?;
        let n = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn category_count(&self) -> Result<i64> {
        let conn = get_conn(&self.pool)?;
        let n = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(n)
    }
}

fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        image_filename: row.get(3)?,
    })
}
