use rusqlite::{params, ErrorCode, OptionalExtension, Transaction};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

pub type CategoryId = i64;

// A lost insert race only needs one re-read; the margin covers a second race
// on the same name before the winner commits.
const MAX_ATTEMPTS: usize = 3;

enum Insert {
    Created(CategoryId),
    Conflict,
}

/// Map a category name to its id, creating the row if it does not exist.
///
/// Must run on the same transaction as the item insert that references the
/// category, so a failed item insert also discards a freshly created category.
/// Names are taken verbatim: no trimming, no case folding.
pub fn resolve(tx: &Transaction<'_>, name: &str) -> Result<CategoryId> {
    resolve_with(tx, name, lookup)
}

fn resolve_with<F>(tx: &Transaction<'_>, name: &str, mut read: F) -> Result<CategoryId>
where
    F: FnMut(&Transaction<'_>, &str) -> Result<Option<CategoryId>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        if let Some(id) = read(tx, name)? {
            return Ok(id);
        }

        match insert(tx, name)? {
            Insert::Created(id) => {
                debug!("Created category {:?} with id {}", name, id);
                return Ok(id);
            }
            Insert::Conflict => {
                warn!(
                    "Category {:?} was created concurrently, re-reading (attempt {}/{})",
                    name, attempt, MAX_ATTEMPTS
                );
            }
        }
    }

    Err(StoreError::storage(format!(
        "Category {:?} kept conflicting after {} attempts",
        name, MAX_ATTEMPTS
    )))
}

pub fn lookup(tx: &Transaction<'_>, name: &str) -> Result<Option<CategoryId>> {
    let mut stmt = tx.prepare_cached("SELECT id FROM categories WHERE name = ?1")?;
    let id = stmt
        .query_row(params![name], |row| row.get(0))
        .optional()?;
    Ok(id)
}

fn insert(tx: &Transaction<'_>, name: &str) -> Result<Insert> {
    let mut stmt = tx.prepare_cached("INSERT INTO categories (name) VALUES (?1) RETURNING id")?;
    match stmt.query_row(params![name], |row| row.get(0)) {
        Ok(id) => Ok(Insert::Created(id)),
        Err(e) if is_unique_violation(&e) => Ok(Insert::Conflict),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
