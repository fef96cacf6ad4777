pub mod service;

pub use service::{ApplyOutcome, ReconcileError, ReconciliationService, RefundError, RetryPolicy};
