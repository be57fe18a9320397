//! Back-office library for rent collection: payment-link issuance,
//! verification intake, reconciliation, and reminder composition.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
