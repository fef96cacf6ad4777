pub mod a001_payment_order;
pub mod a002_enrollment;
pub mod a003_exercise_purchase;
pub mod a004_day_progress;
pub mod a005_premium_access;
pub mod a006_entitlement_grant;
