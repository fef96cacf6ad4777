pub mod u501_checkout;
pub mod u502_reconciliation;
pub mod u503_entitlement_grant;
