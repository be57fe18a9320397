mod common;
mod issuer;
mod reconciliation;
