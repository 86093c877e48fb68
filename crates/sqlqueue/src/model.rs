//! In-memory value types and the persistent row state they project onto.

use serde::{Deserialize, Serialize};

/// A unit of work, identified by a caller-assigned 64-bit ID.
///
/// `Request` is immutable once constructed; the queue never mutates a
/// request's payload, only the row state that surrounds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    pub data: Vec<u8>,
}

impl Request {
    pub fn new(id: i64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

/// The result of processing a [`Request`]: a caller-defined result category
/// plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: i32,
    pub data: Vec<u8>,
}

impl Response {
    pub fn new(code: i32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }
}

/// The lifecycle state of a row, derived from which of its response columns
/// are null: NEW (both null) -> HANDLED (`response_code` set,
/// `response_notification_timestamp` still null) -> NOTIFIED (both set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowState {
    /// `response_code` and `response_notification_timestamp` are both null.
    New,
    /// `response_code` is set, `response_notification_timestamp` is still null.
    Handled,
    /// Both columns are set.
    Notified,
}

impl RowState {
    pub fn as_str(self) -> &'static str {
        match self {
            RowState::New => "NEW",
            RowState::Handled => "HANDLED",
            RowState::Notified => "NOTIFIED",
        }
    }

    /// Derive a row's state from the nullability of its two response
    /// columns, the same predicate the SQL builder's inspection queries
    /// encode directly in `WHERE` clauses.
    pub fn from_columns(response_code_set: bool, notification_timestamp_set: bool) -> Self {
        match (response_code_set, notification_timestamp_set) {
            (false, _) => RowState::New,
            (true, false) => RowState::Handled,
            (true, true) => RowState::Notified,
        }
    }
}
