//! Payment-link issuance, verification intake, and rent reconciliation.
//!
//! The workflow is deliberately split along its storage seams: repositories
//! are traits so the service logic can be exercised against in-memory fakes,
//! and link expiry is computed at read time by [`reconciliation`] rather than
//! ever being written back to storage.

pub mod domain;
pub mod links;
pub mod reconciliation;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    FlatId, LinkId, LinkStatus, PaymentLink, PaymentLinkDraft, PaymentTransaction, RentId,
    RentObligation, ScreenshotUpload, TenantId, TenantSnapshot, WhatsAppReminderRecord,
};
pub use links::{share_url, wa_me_link};
pub use reconciliation::presented_status;
pub use repository::{
    AuditLog, PaymentLinkRepository, RentRepository, RepositoryError, ScreenshotStore,
    StorageError, TenantDirectory,
};
pub use router::payment_router;
pub use service::{
    BulkMarkPaidOutcome, ComposedReminder, IssueLinkRequest, IssuedLink, PaymentLinkView,
    PaymentWorkflowError, PaymentWorkflowService, PublicLinkView, ValidationIssue,
};
