//! Error taxonomy (§7): a single discriminated sum type rather than a
//! checked-exception hierarchy. Each variant preserves the offending
//! [`Request`] where the spec calls for it, and wraps the underlying fault
//! as its `#[source]` so callers can still walk the full chain with
//! `anyhow`/`std::error::Error::source`.

use thiserror::Error;

use crate::model::Request;

/// The error kinds the engine surfaces to its caller.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Generic queue fault, not otherwise categorized. May carry the
    /// offending request when one is known.
    #[error(
        "queue request failure{}: {source}",
        request.as_ref().map(|r| format!(" {}", r.id)).unwrap_or_default()
    )]
    Request {
        request: Option<Request>,
        #[source]
        source: anyhow::Error,
    },

    /// `add` or `handle` could not persist a row. Carries the specific
    /// request for duplicate-on-enqueue failures.
    #[error(
        "failed to save request{}: {source}",
        request.as_ref().map(|r| format!(" {}", r.id)).unwrap_or_default()
    )]
    Save {
        request: Option<Request>,
        #[source]
        source: anyhow::Error,
    },

    /// The injected `compute_response` callback failed for a claimed row.
    #[error("handler failed for request {request_id}: {source}")]
    Handle {
        request_id: i64,
        #[source]
        source: anyhow::Error,
    },

    /// The `respond` pass failed: the SQL layer, the delivery callback, or
    /// the final mark/delete step.
    #[error("respond pass failed: {source}")]
    Response {
        #[source]
        source: anyhow::Error,
    },
}

impl QueueError {
    pub fn save(request: Option<Request>, source: impl Into<anyhow::Error>) -> Self {
        QueueError::Save {
            request,
            source: source.into(),
        }
    }

    pub fn handle(request_id: i64, source: impl Into<anyhow::Error>) -> Self {
        QueueError::Handle {
            request_id,
            source: source.into(),
        }
    }

    pub fn response(source: impl Into<anyhow::Error>) -> Self {
        QueueError::Response {
            source: source.into(),
        }
    }
}

impl From<sqlx::Error> for QueueError {
    fn from(source: sqlx::Error) -> Self {
        QueueError::Request {
            request: None,
            source: source.into(),
        }
    }
}
