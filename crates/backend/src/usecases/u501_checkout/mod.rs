pub mod service;

pub use service::{CheckoutError, CheckoutService};
