use super::domain::{
    LinkId, PaymentLink, PaymentLinkDraft, PaymentTransaction, RentId, RentObligation, TenantId,
    TenantSnapshot, WhatsAppReminderRecord,
};
use chrono::NaiveDate;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only lookup into the tenant table.
pub trait TenantDirectory: Send + Sync {
    fn fetch(&self, id: &TenantId) -> Result<Option<TenantSnapshot>, RepositoryError>;
}

/// Storage abstraction over the rents table.
pub trait RentRepository: Send + Sync {
    fn fetch(&self, id: &RentId) -> Result<Option<RentObligation>, RepositoryError>;
    fn update(&self, rent: RentObligation) -> Result<(), RepositoryError>;
    /// Batch write setting `is_paid = true, paid_on = on` for every id.
    fn mark_paid(&self, ids: &[RentId], on: NaiveDate) -> Result<(), RepositoryError>;
}

/// Storage abstraction over the payment_links table. `create` assigns the id,
/// which is why issuance is a create-then-patch rather than a single insert.
pub trait PaymentLinkRepository: Send + Sync {
    fn create(&self, draft: PaymentLinkDraft) -> Result<PaymentLink, RepositoryError>;
    fn update(&self, link: PaymentLink) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &LinkId) -> Result<Option<PaymentLink>, RepositoryError>;
    fn list(&self) -> Result<Vec<PaymentLink>, RepositoryError>;
    fn for_rent(&self, rent_id: &RentId) -> Result<Vec<PaymentLink>, RepositoryError>;
    /// Hard delete, no cascade.
    fn delete(&self, id: &LinkId) -> Result<(), RepositoryError>;
}

/// Append-only audit sinks: reminder history and payment transactions.
pub trait AuditLog: Send + Sync {
    fn append_reminder(&self, record: WhatsAppReminderRecord) -> Result<(), RepositoryError>;
    fn append_transaction(&self, record: PaymentTransaction) -> Result<(), RepositoryError>;
}

/// Blob store for proof-of-payment screenshots. Returns the public URL the
/// stored object is reachable at.
pub trait ScreenshotStore: Send + Sync {
    fn store(&self, link_id: &LinkId, file_name: &str, bytes: &[u8])
        -> Result<String, StorageError>;
}

/// Screenshot store failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("screenshot store unavailable: {0}")]
    Unavailable(String),
}
