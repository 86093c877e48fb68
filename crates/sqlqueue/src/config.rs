//! Engine configuration, fixed at construction (§6).

use crate::dialect::Dialect;

/// Configuration for a [`crate::Queue`], fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Fully-qualified table name interpolated into every statement.
    pub table: String,
    /// When true, `respond` deletes a row after successful delivery instead
    /// of marking it notified.
    pub delete_after_response_sent: bool,
    /// Maximum rows claimed per `handle` call (`N`).
    pub fetch_for_handling_limit: u32,
    /// Maximum rows claimed per `respond` call (`M`).
    pub fetch_for_notification_limit: u32,
    /// The target database product.
    pub dialect: Dialect,
}

impl QueueConfig {
    pub fn new(table: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            table: table.into(),
            delete_after_response_sent: false,
            fetch_for_handling_limit: 10,
            fetch_for_notification_limit: 10,
            dialect,
        }
    }

    pub fn with_delete_after_response_sent(mut self, delete: bool) -> Self {
        self.delete_after_response_sent = delete;
        self
    }

    pub fn with_fetch_for_handling_limit(mut self, limit: u32) -> Self {
        self.fetch_for_handling_limit = limit;
        self
    }

    pub fn with_fetch_for_notification_limit(mut self, limit: u32) -> Self {
        self.fetch_for_notification_limit = limit;
        self
    }
}
