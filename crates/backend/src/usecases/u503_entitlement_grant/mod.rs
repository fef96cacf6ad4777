pub mod service;

pub use service::{EntitlementService, GrantOutcome};
