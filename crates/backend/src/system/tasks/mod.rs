pub mod worker;

pub use worker::ReconciliationSweepWorker;
