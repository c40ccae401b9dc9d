use crate::db::sqlite::SqlitePool;
use crate::error::AppError;
use crate::types::ranking::{RankingEntry, RankingKind};
use std::collections::HashSet;
use tracing::debug;

/// Structural changes take the write lock when the transaction starts;
/// competing writers wait on the busy timeout.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Per-account ranked lists, one table per [`RankingKind`].
///
/// For every (account, kind) the stored positions are exactly `1..=N`.
/// Every structural change runs in a single transaction, so a failure part
/// way through leaves the list as it was.
#[derive(Clone)]
pub struct RankingStore {
    pool: SqlitePool,
}

impl RankingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Entries ordered by position.
    pub async fn list(
        &self,
        account_id: i64,
        kind: RankingKind,
    ) -> Result<Vec<RankingEntry>, AppError> {
        let sql = format!(
            "SELECT id, name, rank_position FROM {} WHERE user_id = ? ORDER BY rank_position, id",
            kind.table()
        );
        let entries = sqlx::query_as::<_, RankingEntry>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Append `name` at the end of the list.
    pub async fn add(
        &self,
        account_id: i64,
        kind: RankingKind,
        name: &str,
    ) -> Result<RankingEntry, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(format!(
                "{} name is required",
                kind.label()
            )));
        }
        let table = kind.table();

        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let existing: Option<(i64,)> =
            sqlx::query_as(&format!("SELECT id FROM {table} WHERE user_id = ? AND name = ?"))
                .bind(account_id)
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(duplicate(kind));
        }

        let (max_position,): (Option<i64>,) = sqlx::query_as(&format!(
            "SELECT MAX(rank_position) FROM {table} WHERE user_id = ?"
        ))
        .bind(account_id)
        .fetch_one(&mut *tx)
        .await?;
        let rank_position = max_position.unwrap_or(0) + 1;

        let id = sqlx::query(&format!(
            "INSERT INTO {table} (user_id, name, rank_position) VALUES (?, ?, ?)"
        ))
        .bind(account_id)
        .bind(name)
        .bind(rank_position)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => duplicate(kind),
            _ => AppError::Database(e),
        })?
        .last_insert_rowid();

        tx.commit().await?;

        debug!(account_id, %kind, id, rank_position, "ranking added");
        Ok(RankingEntry {
            id,
            name: name.to_string(),
            rank_position,
        })
    }

    /// Renumber the list following `order`.
    ///
    /// Ids the account does not own are ignored, repeats count once. Owned
    /// entries missing from `order` go after the listed ones in their previous
    /// relative order, so the result is always dense.
    pub async fn reorder(
        &self,
        account_id: i64,
        kind: RankingKind,
        order: &[i64],
    ) -> Result<(), AppError> {
        if order.is_empty() {
            return Err(AppError::Validation("Order list is required".to_string()));
        }
        let table = kind.table();

        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let current: Vec<(i64, i64)> = sqlx::query_as(&format!(
            "SELECT id, rank_position FROM {table} WHERE user_id = ? ORDER BY rank_position, id"
        ))
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await?;
        let current_ids: Vec<i64> = current.iter().map(|(id, _)| *id).collect();

        for (idx, id) in dense_order(&current_ids, order).into_iter().enumerate() {
            let position = idx as i64 + 1;
            let unchanged = current
                .iter()
                .any(|&(cid, cpos)| cid == id && cpos == position);
            if unchanged {
                continue;
            }
            sqlx::query(&format!(
                "UPDATE {table} SET rank_position = ? WHERE id = ? AND user_id = ?"
            ))
            .bind(position)
            .bind(id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(account_id, %kind, count = current.len(), "rankings reordered");
        Ok(())
    }

    /// Delete one entry and close the gap it leaves.
    pub async fn remove(&self, account_id: i64, kind: RankingKind, id: i64) -> Result<(), AppError> {
        let table = kind.table();

        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let found: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT rank_position FROM {table} WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((old_position,)) = found else {
            return Err(AppError::NotFound("Not found".to_string()));
        };

        sqlx::query(&format!("DELETE FROM {table} WHERE id = ? AND user_id = ?"))
            .bind(id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!(
            "UPDATE {table} SET rank_position = rank_position - 1 \
             WHERE user_id = ? AND rank_position > ?"
        ))
        .bind(account_id)
        .bind(old_position)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(account_id, %kind, id, old_position, "ranking removed");
        Ok(())
    }
}

fn duplicate(kind: RankingKind) -> AppError {
    AppError::Duplicate(format!("{} already in your list", kind.label()))
}

/// Requested owned ids first (deduplicated), then the remaining owned ids as they were.
fn dense_order(current: &[i64], requested: &[i64]) -> Vec<i64> {
    let owned: HashSet<i64> = current.iter().copied().collect();
    let mut placed = HashSet::with_capacity(current.len());

    let mut order: Vec<i64> = requested
        .iter()
        .copied()
        .filter(|id| owned.contains(id) && placed.insert(*id))
        .collect();
    order.extend(current.iter().copied().filter(|id| !placed.contains(id)));
    order
}
