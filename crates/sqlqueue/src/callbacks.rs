//! The two injected capabilities the embedder supplies (§6). These replace
//! the subclass-with-abstract-methods pattern of the original design with a
//! pair of small async traits; the engine holds them as `Arc<dyn Trait>`,
//! not as a base class it inherits from.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::model::{Request, Response};

/// Computes a [`Response`] for a [`Request`].
///
/// Pure with respect to the queue itself: the transaction handed in is the
/// same one the engine will use to save the response, so implementations
/// may perform additional application writes through it and have them
/// commit atomically with the response save. Implementations must not
/// retain the transaction past the call.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn compute_response(
        &self,
        request: &Request,
        txn: &mut Transaction<'_, Postgres>,
    ) -> anyhow::Result<Response>;
}

/// Delivers a computed [`Response`] to whatever external sink the embedder
/// configured. Must be idempotent with respect to `request_id`: the engine
/// guarantees at-least-once delivery, so a crash after a successful call but
/// before commit causes a redelivery on the next `respond` pass.
#[async_trait]
pub trait ResponseDeliverer: Send + Sync {
    async fn deliver_response(&self, request_id: i64, response: &Response) -> anyhow::Result<()>;
}
