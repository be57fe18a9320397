use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::reconciliation::presented_status;

/// Identifier wrapper for tenants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Identifier wrapper for flats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatId(pub String);

/// Identifier wrapper for rent obligations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RentId(pub String);

/// Identifier wrapper for payment links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub String);

/// Minimal tenant projection the payment workflow needs: display name for the
/// shareable URL, phone for reminders, current flat for referential checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub id: TenantId,
    pub full_name: String,
    pub phone: Option<String>,
    pub flat_id: Option<FlatId>,
}

/// One tenant's due-date/amount record for a billing period.
///
/// The paid flag and `paid_on` move together through [`RentObligation::mark_paid`];
/// the fields are private so no caller can set one without the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentObligation {
    pub id: RentId,
    pub tenant_id: TenantId,
    pub flat_id: FlatId,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    is_paid: bool,
    paid_on: Option<NaiveDate>,
    pub reminder_message: Option<String>,
    pub last_reminder_date: Option<NaiveDate>,
}

impl RentObligation {
    pub fn new(
        id: RentId,
        tenant_id: TenantId,
        flat_id: FlatId,
        due_date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            id,
            tenant_id,
            flat_id,
            due_date,
            amount,
            is_paid: false,
            paid_on: None,
            reminder_message: None,
            last_reminder_date: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_on(&self) -> Option<NaiveDate> {
        self.paid_on
    }

    /// The only way to flip an obligation to paid.
    pub fn mark_paid(&mut self, on: NaiveDate) {
        self.is_paid = true;
        self.paid_on = Some(on);
    }
}

/// Stored and presented status of a payment link. `Expired` only ever appears
/// as a presented value; it is never written to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Active,
    Completed,
    Expired,
}

impl LinkStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LinkStatus::Active => "active",
            LinkStatus::Completed => "completed",
            LinkStatus::Expired => "expired",
        }
    }
}

/// Everything the issuer knows about a link before storage has assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLinkDraft {
    pub tenant_id: TenantId,
    pub rent_id: Option<RentId>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A shareable, time-limited URL through which a tenant self-reports payment.
///
/// The stored status column is private; read paths go through
/// [`PaymentLink::presented_status`] so nothing branches on a stale `active`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLink {
    pub id: LinkId,
    pub tenant_id: TenantId,
    pub rent_id: Option<RentId>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    status: LinkStatus,
    pub share_url: Option<String>,
    pub screenshot_url: Option<String>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentLink {
    pub fn from_draft(id: LinkId, draft: PaymentLinkDraft) -> Self {
        debug_assert!(draft.expires_at > draft.generated_at);
        Self {
            id,
            tenant_id: draft.tenant_id,
            rent_id: draft.rent_id,
            amount: draft.amount,
            description: draft.description,
            generated_at: draft.generated_at,
            expires_at: draft.expires_at,
            status: LinkStatus::Active,
            share_url: None,
            screenshot_url: None,
            notes: None,
            completed_at: None,
        }
    }

    /// Status as every read path must see it: completion is terminal, expiry
    /// is derived from the clock rather than trusted from storage.
    pub fn presented_status(&self, now: DateTime<Utc>) -> LinkStatus {
        presented_status(self.status, Some(self.expires_at), now)
    }

    pub fn is_completed(&self) -> bool {
        self.status == LinkStatus::Completed
    }

    pub fn set_share_url(&mut self, url: String) {
        self.share_url = Some(url);
    }

    /// Transition active -> completed. Preconditions (not expired, not already
    /// completed) are the service's responsibility.
    pub fn complete(
        &mut self,
        screenshot_url: String,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
    ) {
        self.status = LinkStatus::Completed;
        self.screenshot_url = Some(screenshot_url);
        self.notes = notes;
        self.completed_at = Some(completed_at);
    }
}

/// Proof-of-payment image as submitted by a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ScreenshotUpload {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Append-only audit entry for a reminder that was composed and handed to the
/// client to open. Never read back to drive state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppReminderRecord {
    pub tenant_id: TenantId,
    pub rent_id: RentId,
    pub message: String,
    pub phone: String,
    pub sent_at: DateTime<Utc>,
    pub included_payment_link: bool,
}

/// Audit row written when an obligation is marked paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub rent_id: RentId,
    pub tenant_id: TenantId,
    pub amount: Decimal,
    pub recorded_on: NaiveDate,
}
