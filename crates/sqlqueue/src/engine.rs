//! The queue orchestrator: `add`, `handle`, `respond`, inspection queries,
//! and bulk delete (§4.3–§4.6). Owns transaction boundaries and invokes the
//! injected [`RequestHandler`]/[`ResponseDeliverer`] callbacks.

use std::sync::Arc;

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{error, info, instrument};

use crate::callbacks::{RequestHandler, ResponseDeliverer};
use crate::config::QueueConfig;
use crate::dialect::DialectProfile;
use crate::error::QueueError;
use crate::model::{Request, Response, RowState};
use crate::sql;

/// The queue engine. Holds exactly one pooled connection for the duration
/// of each public call, released on every exit path via sqlx's own
/// `Transaction` drop guard (an implicit rollback if never committed).
///
/// Cheaply `Clone`: the pool is its own connection pool handle and the
/// callbacks are `Arc`-wrapped, so a clone is fit to hand to a worker task.
#[derive(Clone)]
pub struct Queue {
    pool: PgPool,
    config: QueueConfig,
    handler: Arc<dyn RequestHandler>,
    deliverer: Arc<dyn ResponseDeliverer>,
}

impl Queue {
    pub fn new(
        pool: PgPool,
        config: QueueConfig,
        handler: Arc<dyn RequestHandler>,
        deliverer: Arc<dyn ResponseDeliverer>,
    ) -> Self {
        Self {
            pool,
            config,
            handler,
            deliverer,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn profile(&self) -> DialectProfile {
        self.config.dialect.profile()
    }

    /// Insert a batch of new requests in a single transaction (§4.5).
    #[instrument(skip(self, requests), fields(table = %self.config.table, count = requests.len()))]
    pub async fn add(
        &self,
        requests: &[Request],
        fail_if_duplicate: bool,
    ) -> Result<(), QueueError> {
        info!("add: starting batch insert");
        let statement = sql::insert_new(&self.config.table, &self.profile());
        let mut txn: Transaction<'_, Postgres> = self
            .pool
            .begin()
            .await
            .map_err(|source| QueueError::save(None, source))?;

        for request in requests {
            match sqlx::query(&statement)
                .bind(request.id)
                .bind(&request.data)
                .execute(&mut *txn)
                .await
            {
                Ok(outcome) if outcome.rows_affected() == 0 && fail_if_duplicate => {
                    error!(request_id = request.id, "add: duplicate request rejected");
                    return Err(QueueError::save(
                        Some(request.clone()),
                        anyhow::anyhow!("request {} already exists", request.id),
                    ));
                }
                Ok(_) => {}
                Err(source) if fail_if_duplicate && is_unique_violation(&source) => {
                    error!(request_id = request.id, "add: duplicate request rejected");
                    return Err(QueueError::save(Some(request.clone()), source));
                }
                Err(source) if is_unique_violation(&source) => {
                    // fail_if_duplicate is false: ignore and move on.
                    let _ = source;
                }
                Err(source) => return Err(QueueError::save(Some(request.clone()), source)),
            }
        }

        txn.commit()
            .await
            .map_err(|source| QueueError::save(None, source))?;
        info!("add: committed batch insert");
        Ok(())
    }

    /// Claim up to `N` NEW rows, run `compute_response` for each, and
    /// persist the responses, all in a single transaction (§4.3).
    #[instrument(skip(self), fields(table = %self.config.table, limit = self.config.fetch_for_handling_limit))]
    pub async fn handle(&self) -> Result<(), QueueError> {
        info!("handle: claiming new batch");
        let profile = self.profile();
        let mut txn: Transaction<'_, Postgres> = self
            .pool
            .begin()
            .await
            .map_err(|source| QueueError::save(None, source))?;

        let claim_sql = sql::claim_new_batch(
            &self.config.table,
            &profile,
            self.config.fetch_for_handling_limit,
        );
        let rows = sqlx::query(&claim_sql)
            .fetch_all(&mut *txn)
            .await
            .map_err(|source| QueueError::save(None, source))?;

        let mut handled = 0usize;
        for row in rows {
            let request_id: i64 = row
                .try_get("request_id")
                .map_err(|source| QueueError::save(None, source))?;

            if profile.requires_single_row_relock()
                && !self
                    .relock(&mut txn, &profile, request_id, true)
                    .await
                    .map_err(|source| QueueError::save(None, source))?
            {
                // Another worker claimed this row between our unlocked
                // batch read and the re-lock attempt; skip silently.
                continue;
            }

            let data: Vec<u8> = row
                .try_get("request")
                .map_err(|source| QueueError::save(None, source))?;
            let request = Request::new(request_id, data);

            let response = self
                .handler
                .compute_response(&request, &mut txn)
                .await
                .map_err(|source| QueueError::handle(request_id, source))?;

            let save_sql = sql::save_response(&self.config.table);
            sqlx::query(&save_sql)
                .bind(response.code)
                .bind(&response.data)
                .bind(request_id)
                .execute(&mut *txn)
                .await
                .map_err(|source| QueueError::save(Some(request), source))?;

            handled += 1;
        }

        txn.commit()
            .await
            .map_err(|source| QueueError::save(None, source))?;
        info!(handled, "handle: committed batch");
        Ok(())
    }

    /// Claim up to `M` HANDLED rows, deliver each response, then mark it
    /// NOTIFIED or delete it, all in a single transaction (§4.4).
    #[instrument(skip(self), fields(table = %self.config.table, limit = self.config.fetch_for_notification_limit))]
    pub async fn respond(&self) -> Result<(), QueueError> {
        info!("respond: claiming handled batch");
        let profile = self.profile();
        let mut txn: Transaction<'_, Postgres> =
            self.pool.begin().await.map_err(QueueError::response)?;

        let claim_sql = sql::claim_handled_batch(
            &self.config.table,
            &profile,
            self.config.fetch_for_notification_limit,
        );
        let rows = sqlx::query(&claim_sql)
            .fetch_all(&mut *txn)
            .await
            .map_err(QueueError::response)?;

        let mut delivered = 0usize;
        for row in rows {
            let request_id: i64 = row.try_get("request_id").map_err(QueueError::response)?;

            if profile.requires_single_row_relock()
                && !self
                    .relock(&mut txn, &profile, request_id, false)
                    .await
                    .map_err(QueueError::response)?
            {
                continue;
            }

            let code: i32 = row.try_get("response_code").map_err(QueueError::response)?;
            let data: Vec<u8> = row.try_get("response").map_err(QueueError::response)?;
            let response = Response::new(code, data);

            self.deliverer
                .deliver_response(request_id, &response)
                .await
                .map_err(QueueError::response)?;

            if self.config.delete_after_response_sent {
                let delete_sql = sql::delete_one(&self.config.table);
                sqlx::query(&delete_sql)
                    .bind(request_id)
                    .execute(&mut *txn)
                    .await
                    .map_err(QueueError::response)?;
            } else {
                let mark_sql = sql::mark_notified(&self.config.table);
                sqlx::query(&mark_sql)
                    .bind(request_id)
                    .execute(&mut *txn)
                    .await
                    .map_err(QueueError::response)?;
            }

            delivered += 1;
        }

        txn.commit().await.map_err(QueueError::response)?;
        info!(delivered, "respond: committed batch");
        Ok(())
    }

    /// Re-lock a single candidate row with the dialect's row-lock clause.
    /// Returns `false` (without erroring) when a peer worker already holds
    /// the row. Only called for dialects whose batch claim cannot itself
    /// take a row lock (Oracle, per §4.1).
    async fn relock(
        &self,
        txn: &mut Transaction<'_, Postgres>,
        profile: &DialectProfile,
        request_id: i64,
        new_state: bool,
    ) -> Result<bool, sqlx::Error> {
        let statement = if new_state {
            sql::relock_new_by_id(&self.config.table, profile)
        } else {
            sql::relock_handled_by_id(&self.config.table, profile)
        };
        let relocked = sqlx::query(&statement)
            .bind(request_id)
            .fetch_optional(&mut **txn)
            .await?;
        Ok(relocked.is_some())
    }

    /// Delete every row in the table. Returns the number of rows deleted.
    #[instrument(skip(self), fields(table = %self.config.table))]
    pub async fn delete_all(&self) -> Result<u64, QueueError> {
        let statement = sql::delete_all(&self.config.table);
        let result = sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(QueueError::from)?;
        let deleted = result.rows_affected();
        info!(deleted, "delete_all: removed rows");
        Ok(deleted)
    }

    pub async fn not_handled_request_ids(&self) -> Result<Vec<i64>, QueueError> {
        self.select_ids(&sql::select_not_handled_ids(&self.config.table))
            .await
    }

    pub async fn not_notified_request_ids(&self) -> Result<Vec<i64>, QueueError> {
        self.select_ids(&sql::select_not_notified_ids(&self.config.table))
            .await
    }

    pub async fn notified_request_ids(&self) -> Result<Vec<i64>, QueueError> {
        self.select_ids(&sql::select_notified_ids(&self.config.table))
            .await
    }

    /// The current [`RowState`] of a single request, or `None` if no row
    /// with that ID exists.
    pub async fn row_state(&self, request_id: i64) -> Result<Option<RowState>, QueueError> {
        let statement = sql::select_row_state_columns(&self.config.table);
        let row = sqlx::query(&statement)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueueError::from)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let response_code_set: bool = row.try_get("response_code_set").map_err(QueueError::from)?;
        let notified_set: bool = row.try_get("notified_set").map_err(QueueError::from)?;
        Ok(Some(RowState::from_columns(response_code_set, notified_set)))
    }

    async fn select_ids(&self, statement: &str) -> Result<Vec<i64>, QueueError> {
        let rows = sqlx::query(statement)
            .fetch_all(&self.pool)
            .await
            .map_err(QueueError::from)?;
        rows.into_iter()
            .map(|row| row.try_get::<i64, _>("request_id").map_err(QueueError::from))
            .collect()
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
