//! A durable, multi-consumer work queue whose state of record lives in a
//! PostgreSQL table.
//!
//! Producers enqueue [`Request`]s with [`Queue::add`]; worker processes call
//! [`Queue::handle`] to claim a batch of unhandled requests, run an injected
//! [`RequestHandler`], and persist the response; they then call
//! [`Queue::respond`] to claim handled-but-undelivered responses and hand
//! them to an injected [`ResponseDeliverer`]. At-most-one concurrent
//! processor per row is guaranteed by the database's own row-level locking
//! with skip-locked semantics — no application-level coordination is
//! involved.
//!
//! The SQL fragments that vary between PostgreSQL, Oracle, MySQL, MS SQL
//! Server, and DB2 live in [`dialect`]; the six canonical statements they
//! parameterize live in [`sql`]. Both are pure, unit-testable without a
//! database connection. [`engine::Queue`] is the only part of this crate
//! that actually talks to a database, and it talks to PostgreSQL via
//! `sqlx::PgPool`.

mod callbacks;
mod config;
mod dialect;
mod engine;
mod error;
mod model;
mod sql;

#[cfg(test)]
mod tests;

pub use callbacks::{RequestHandler, ResponseDeliverer};
pub use config::QueueConfig;
pub use dialect::{Dialect, DialectProfile};
pub use engine::Queue;
pub use error::QueueError;
pub use model::{Request, Response, RowState};
