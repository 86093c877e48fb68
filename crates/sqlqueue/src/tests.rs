//! Shared test-only plumbing: start a disposable PostgreSQL container and
//! build a [`crate::Queue`] against it. Mirrors the reference crate's own
//! `start_test_postgres` helper.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use testcontainers_modules::postgres;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::{ContainerAsync, ImageExt};

use crate::{Dialect, Queue, QueueConfig, Request, RequestHandler, Response, ResponseDeliverer};

#[must_use = "Postgres container must be kept alive for the duration of the test"]
pub async fn start_test_postgres() -> (ContainerAsync<Postgres>, PgPool) {
    let postgres_tag = std::env::var("TEST_POSTGRES_TAG").unwrap_or_else(|_| "14-alpine".to_string());
    let container = postgres::Postgres::default()
        .with_init_sql(include_bytes!("../../../demos/schema.sql").to_vec())
        .with_user("user")
        .with_password("password")
        .with_tag(&postgres_tag)
        .start()
        .await
        .expect("starting postgres test container");

    let host_ip = container.get_host().await.expect("container host");
    let host_port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");
    let dsn = format!("postgresql://user:password@{host_ip}:{host_port}/postgres");
    let pool = PgPool::connect(&dsn)
        .await
        .expect("connecting to test postgres");

    (container, pool)
}

/// Handler matching this crate's echo-handler test convention:
/// `response<id> = "response" + id`.
pub struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn compute_response(
        &self,
        request: &Request,
        _txn: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> anyhow::Result<Response> {
        Ok(Response::new(
            0,
            format!("response{}", request.id).into_bytes(),
        ))
    }
}

/// Deliverer that records every delivery it receives, for assertions, and
/// verifies the payload matches the `EchoHandler` convention.
pub struct RecordingDeliverer {
    pub delivered: std::sync::Mutex<Vec<(i64, Response)>>,
}

impl RecordingDeliverer {
    pub fn new() -> Self {
        Self {
            delivered: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ResponseDeliverer for RecordingDeliverer {
    async fn deliver_response(&self, request_id: i64, response: &Response) -> anyhow::Result<()> {
        let expected = format!("response{request_id}").into_bytes();
        anyhow::ensure!(
            response.data == expected,
            "delivered response for {request_id} did not match the echo convention"
        );
        self.delivered
            .lock()
            .expect("deliverer lock")
            .push((request_id, response.clone()));
        Ok(())
    }
}

pub fn test_queue(
    pool: PgPool,
    limit: u32,
    delete_after_response_sent: bool,
) -> (Queue, Arc<RecordingDeliverer>) {
    let deliverer = Arc::new(RecordingDeliverer::new());
    let config = QueueConfig::new("test.test_task", Dialect::PostgreSql)
        .with_fetch_for_handling_limit(limit)
        .with_fetch_for_notification_limit(limit)
        .with_delete_after_response_sent(delete_after_response_sent);
    let queue = Queue::new(pool, config, Arc::new(EchoHandler), deliverer.clone());
    (queue, deliverer)
}
