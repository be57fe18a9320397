use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PaymentLinkConfig;

use super::domain::{
    LinkId, LinkStatus, PaymentLink, PaymentLinkDraft, PaymentTransaction, RentId, RentObligation,
    ScreenshotUpload, TenantId, TenantSnapshot, WhatsAppReminderRecord,
};
use super::links::{default_reminder_message, share_url, wa_me_link};
use super::repository::{
    AuditLog, PaymentLinkRepository, RentRepository, RepositoryError, ScreenshotStore,
    StorageError, TenantDirectory,
};

/// Longest expiry window a request may ask for. Also keeps the deadline
/// arithmetic inside chrono's representable range.
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// Service composing the payment-link issuer, verification receiver,
/// reconciliation policy, and bulk rent operations over storage traits.
pub struct PaymentWorkflowService<D, R, P, A, S> {
    tenants: Arc<D>,
    rents: Arc<R>,
    links: Arc<P>,
    audit: Arc<A>,
    screenshots: Arc<S>,
    config: PaymentLinkConfig,
}

/// Input for link issuance.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueLinkRequest {
    pub tenant_id: TenantId,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rent_id: Option<RentId>,
    /// Defaults to the configured window (7 days) when absent.
    #[serde(default)]
    pub expiry_days: Option<i64>,
}

/// Result of link issuance: the id and the final shareable URL.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedLink {
    pub link_id: LinkId,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Read model for back-office link listings; `status` is always the
/// presented status, never the raw stored column.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentLinkView {
    pub link_id: LinkId,
    pub tenant_id: TenantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_id: Option<RentId>,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: &'static str,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentLinkView {
    fn from_link(link: PaymentLink, now: DateTime<Utc>) -> Self {
        let status = link.presented_status(now).label();
        Self {
            link_id: link.id,
            tenant_id: link.tenant_id,
            rent_id: link.rent_id,
            amount: link.amount,
            description: link.description,
            status,
            generated_at: link.generated_at,
            expires_at: link.expires_at,
            share_url: link.share_url,
            screenshot_url: link.screenshot_url,
            notes: link.notes,
            completed_at: link.completed_at,
        }
    }
}

/// Read model for the public, unauthenticated verification page.
#[derive(Debug, Clone, Serialize)]
pub struct PublicLinkView {
    pub link_id: LinkId,
    pub tenant_name: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a bulk mark-paid run; lists the ids actually updated
/// (already-paid obligations validate but are left untouched).
#[derive(Debug, Clone, Serialize)]
pub struct BulkMarkPaidOutcome {
    pub updated: Vec<RentId>,
    pub paid_on: NaiveDate,
}

/// A reminder composed for the client to open; the server never talks to
/// WhatsApp itself.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedReminder {
    pub rent_id: RentId,
    pub tenant_id: TenantId,
    pub phone: String,
    pub message: String,
    pub wa_link: String,
    pub included_payment_link: bool,
}

/// Bad input shape or range, rejected before any row is persisted.
#[derive(Debug, thiserror::Error)]
pub enum ValidationIssue {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("expiry window must be at least 1 day, got {0}")]
    ExpiryWindowTooShort(i64),
    #[error("expiry window must be at most {MAX_EXPIRY_DAYS} days, got {0}")]
    ExpiryWindowTooLong(i64),
    #[error("tenant '{}' does not resolve to an existing tenant", .0 .0)]
    UnknownTenant(TenantId),
    #[error("unsupported screenshot media type '{0}' (allowed: image/jpeg, image/png)")]
    UnsupportedMediaType(String),
    #[error("screenshot of {found} bytes exceeds the {limit} byte limit")]
    OversizedScreenshot { limit: usize, found: usize },
}

/// Error raised by the payment workflow service.
#[derive(Debug, thiserror::Error)]
pub enum PaymentWorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationIssue),
    #[error("payment link '{}' not found", .0 .0)]
    LinkNotFound(LinkId),
    #[error("rent obligation '{}' not found", .0 .0)]
    RentNotFound(RentId),
    #[error("tenant '{}' not found", .0 .0)]
    TenantNotFound(TenantId),
    #[error("payment link '{}' has expired and can no longer be verified", .0 .0)]
    ExpiredLink(LinkId),
    #[error("payment link '{}' is already completed", .0 .0)]
    AlreadyCompleted(LinkId),
    #[error(
        "tenant '{}' is no longer assigned to flat '{}' recorded on rent '{}'",
        .tenant_id.0, .flat_id, .rent_id.0
    )]
    ReferentialInconsistency {
        rent_id: RentId,
        tenant_id: TenantId,
        flat_id: String,
    },
    #[error("tenant '{}' has no phone number on file", .0 .0)]
    MissingPhone(TenantId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PaymentWorkflowError {
    /// HTTP status each error class surfaces as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentWorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentWorkflowError::LinkNotFound(_)
            | PaymentWorkflowError::RentNotFound(_)
            | PaymentWorkflowError::TenantNotFound(_)
            | PaymentWorkflowError::MissingPhone(_) => StatusCode::NOT_FOUND,
            PaymentWorkflowError::ExpiredLink(_) => StatusCode::GONE,
            PaymentWorkflowError::AlreadyCompleted(_)
            | PaymentWorkflowError::ReferentialInconsistency { .. }
            | PaymentWorkflowError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            PaymentWorkflowError::Repository(_) | PaymentWorkflowError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl<D, R, P, A, S> PaymentWorkflowService<D, R, P, A, S>
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    pub fn new(
        tenants: Arc<D>,
        rents: Arc<R>,
        links: Arc<P>,
        audit: Arc<A>,
        screenshots: Arc<S>,
        config: PaymentLinkConfig,
    ) -> Self {
        Self {
            tenants,
            rents,
            links,
            audit,
            screenshots,
            config,
        }
    }

    /// Request-body ceiling for the verification endpoint: the screenshot cap
    /// after base64 expansion, plus headroom for the JSON envelope.
    pub fn verify_body_limit(&self) -> usize {
        self.config.max_screenshot_bytes / 3 * 4 + 64 * 1024
    }

    /// Issue a payment link: validate, create the row, then patch the
    /// shareable URL onto it once storage has assigned the id.
    ///
    /// The create and the patch are two independent writes; a failed patch
    /// surfaces as an error and leaves an active link without a share URL.
    pub fn issue_link(
        &self,
        request: IssueLinkRequest,
        now: DateTime<Utc>,
    ) -> Result<IssuedLink, PaymentWorkflowError> {
        if request.amount <= Decimal::ZERO {
            return Err(ValidationIssue::NonPositiveAmount(request.amount).into());
        }
        let expiry_days = request
            .expiry_days
            .unwrap_or(self.config.default_expiry_days);
        if expiry_days < 1 {
            return Err(ValidationIssue::ExpiryWindowTooShort(expiry_days).into());
        }
        if expiry_days > MAX_EXPIRY_DAYS {
            return Err(ValidationIssue::ExpiryWindowTooLong(expiry_days).into());
        }

        let tenant = self
            .tenants
            .fetch(&request.tenant_id)?
            .ok_or_else(|| ValidationIssue::UnknownTenant(request.tenant_id.clone()))?;

        let draft = PaymentLinkDraft {
            tenant_id: request.tenant_id,
            rent_id: request.rent_id,
            amount: request.amount,
            description: request.description,
            generated_at: now,
            expires_at: now + Duration::days(expiry_days),
        };

        let mut link = self.links.create(draft)?;
        let url = share_url(
            &self.config.public_origin,
            &link.id,
            link.amount,
            &tenant.full_name,
        );
        link.set_share_url(url.clone());
        let expires_at = link.expires_at;
        let link_id = link.id.clone();
        self.links.update(link)?;

        info!(link = %link_id.0, tenant = %tenant.id.0, "payment link issued");

        Ok(IssuedLink {
            link_id,
            share_url: url,
            expires_at,
        })
    }

    /// Verification receiver: accept a proof-of-payment screenshot against an
    /// active link and complete it.
    ///
    /// The blob is stored before the row is touched, so a failed row write
    /// leaves the link active (the orphan blob is harmless). The underlying
    /// rent obligation is not marked paid here; reconciliation stays an
    /// explicit action.
    pub fn verify_link(
        &self,
        link_id: &LinkId,
        upload: ScreenshotUpload,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentLinkView, PaymentWorkflowError> {
        validate_screenshot(&upload, self.config.max_screenshot_bytes)?;

        let mut link = self
            .links
            .fetch(link_id)?
            .ok_or_else(|| PaymentWorkflowError::LinkNotFound(link_id.clone()))?;

        match link.presented_status(now) {
            LinkStatus::Expired => {
                return Err(PaymentWorkflowError::ExpiredLink(link_id.clone()));
            }
            LinkStatus::Completed => {
                return Err(PaymentWorkflowError::AlreadyCompleted(link_id.clone()));
            }
            LinkStatus::Active => {}
        }

        let screenshot_url = self
            .screenshots
            .store(link_id, &upload.file_name, &upload.bytes)?;
        link.complete(screenshot_url, notes, now);
        self.links.update(link.clone())?;

        info!(link = %link_id.0, "payment link verified");

        Ok(PaymentLinkView::from_link(link, now))
    }

    /// Single-link read model, always through the reconciliation policy.
    pub fn link_view(
        &self,
        link_id: &LinkId,
        now: DateTime<Utc>,
    ) -> Result<PaymentLinkView, PaymentWorkflowError> {
        let link = self
            .links
            .fetch(link_id)?
            .ok_or_else(|| PaymentWorkflowError::LinkNotFound(link_id.clone()))?;
        Ok(PaymentLinkView::from_link(link, now))
    }

    /// Listing read model for back-office screens.
    pub fn list_links(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentLinkView>, PaymentWorkflowError> {
        let links = self.links.list()?;
        Ok(links
            .into_iter()
            .map(|link| PaymentLinkView::from_link(link, now))
            .collect())
    }

    /// Resolve a link for the public verification page.
    pub fn public_view(
        &self,
        link_id: &LinkId,
        now: DateTime<Utc>,
    ) -> Result<PublicLinkView, PaymentWorkflowError> {
        let link = self
            .links
            .fetch(link_id)?
            .ok_or_else(|| PaymentWorkflowError::LinkNotFound(link_id.clone()))?;
        let tenant = self
            .tenants
            .fetch(&link.tenant_id)?
            .ok_or_else(|| PaymentWorkflowError::TenantNotFound(link.tenant_id.clone()))?;
        Ok(PublicLinkView {
            link_id: link.id.clone(),
            tenant_name: tenant.full_name,
            amount: link.amount,
            description: link.description.clone(),
            status: link.presented_status(now).label(),
            expires_at: link.expires_at,
        })
    }

    /// Administrative hard delete.
    pub fn delete_link(&self, link_id: &LinkId) -> Result<(), PaymentWorkflowError> {
        self.links
            .fetch(link_id)?
            .ok_or_else(|| PaymentWorkflowError::LinkNotFound(link_id.clone()))?;
        self.links.delete(link_id)?;
        Ok(())
    }

    /// Bulk mark-as-paid, all-or-nothing at the validation stage: every
    /// obligation's tenant must still be assigned to the obligation's
    /// recorded flat before a single write happens. Audit rows and the batch
    /// update remain two non-atomic writes.
    pub fn mark_paid_bulk(
        &self,
        rent_ids: &[RentId],
        today: NaiveDate,
    ) -> Result<BulkMarkPaidOutcome, PaymentWorkflowError> {
        let mut pending: Vec<RentObligation> = Vec::with_capacity(rent_ids.len());
        let mut seen: HashSet<&RentId> = HashSet::with_capacity(rent_ids.len());

        for rent_id in rent_ids {
            // A repeated id must not produce a second audit row.
            if !seen.insert(rent_id) {
                continue;
            }
            let rent = self
                .rents
                .fetch(rent_id)?
                .ok_or_else(|| PaymentWorkflowError::RentNotFound(rent_id.clone()))?;
            let tenant = self
                .tenants
                .fetch(&rent.tenant_id)?
                .ok_or_else(|| PaymentWorkflowError::TenantNotFound(rent.tenant_id.clone()))?;
            check_flat_assignment(&rent, &tenant)?;
            if !rent.is_paid() {
                pending.push(rent);
            }
        }

        for rent in &pending {
            self.audit.append_transaction(PaymentTransaction {
                rent_id: rent.id.clone(),
                tenant_id: rent.tenant_id.clone(),
                amount: rent.amount,
                recorded_on: today,
            })?;
        }

        let updated: Vec<RentId> = pending.into_iter().map(|rent| rent.id).collect();
        self.rents.mark_paid(&updated, today)?;

        info!(count = updated.len(), "rent obligations marked paid");

        Ok(BulkMarkPaidOutcome {
            updated,
            paid_on: today,
        })
    }

    /// Compose WhatsApp reminders for the given obligations. Paid obligations
    /// are skipped; each composed reminder is logged and stamps
    /// `last_reminder_date`. Opening the wa.me link is the client's job.
    pub fn send_reminders(
        &self,
        rent_ids: &[RentId],
        now: DateTime<Utc>,
    ) -> Result<Vec<ComposedReminder>, PaymentWorkflowError> {
        let mut composed = Vec::new();

        for rent_id in rent_ids {
            let mut rent = self
                .rents
                .fetch(rent_id)?
                .ok_or_else(|| PaymentWorkflowError::RentNotFound(rent_id.clone()))?;
            if rent.is_paid() {
                continue;
            }
            let tenant = self
                .tenants
                .fetch(&rent.tenant_id)?
                .ok_or_else(|| PaymentWorkflowError::TenantNotFound(rent.tenant_id.clone()))?;
            let phone = tenant
                .phone
                .clone()
                .ok_or_else(|| PaymentWorkflowError::MissingPhone(tenant.id.clone()))?;

            let mut message = rent.reminder_message.clone().unwrap_or_else(|| {
                default_reminder_message(&tenant.full_name, rent.amount, rent.due_date)
            });

            let active_link_url = self.active_link_url_for(rent_id, now)?;
            let included_payment_link = active_link_url.is_some();
            if let Some(url) = active_link_url {
                message = format!("{message} Pay here: {url}");
            }

            let wa_link = wa_me_link(&phone, &message)
                .ok_or_else(|| PaymentWorkflowError::MissingPhone(tenant.id.clone()))?;

            self.audit.append_reminder(WhatsAppReminderRecord {
                tenant_id: tenant.id.clone(),
                rent_id: rent.id.clone(),
                message: message.clone(),
                phone: phone.clone(),
                sent_at: now,
                included_payment_link,
            })?;

            rent.last_reminder_date = Some(now.date_naive());
            self.rents.update(rent.clone())?;

            composed.push(ComposedReminder {
                rent_id: rent.id,
                tenant_id: tenant.id,
                phone,
                message,
                wa_link,
                included_payment_link,
            });
        }

        Ok(composed)
    }

    fn active_link_url_for(
        &self,
        rent_id: &RentId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, PaymentWorkflowError> {
        let candidates = self.links.for_rent(rent_id)?;
        Ok(candidates
            .into_iter()
            .filter(|link| link.presented_status(now) == LinkStatus::Active)
            .find_map(|link| link.share_url))
    }
}

fn validate_screenshot(
    upload: &ScreenshotUpload,
    max_bytes: usize,
) -> Result<(), ValidationIssue> {
    let parsed: mime::Mime = upload
        .media_type
        .parse()
        .map_err(|_| ValidationIssue::UnsupportedMediaType(upload.media_type.clone()))?;
    let allowed = parsed.essence_str() == mime::IMAGE_JPEG.essence_str()
        || parsed.essence_str() == mime::IMAGE_PNG.essence_str();
    if !allowed {
        return Err(ValidationIssue::UnsupportedMediaType(upload.media_type.clone()));
    }
    if upload.size_bytes() > max_bytes {
        return Err(ValidationIssue::OversizedScreenshot {
            limit: max_bytes,
            found: upload.size_bytes(),
        });
    }
    Ok(())
}

fn check_flat_assignment(
    rent: &RentObligation,
    tenant: &TenantSnapshot,
) -> Result<(), PaymentWorkflowError> {
    let still_assigned = tenant
        .flat_id
        .as_ref()
        .is_some_and(|flat| *flat == rent.flat_id);
    if still_assigned {
        Ok(())
    } else {
        Err(PaymentWorkflowError::ReferentialInconsistency {
            rent_id: rent.id.clone(),
            tenant_id: tenant.id.clone(),
            flat_id: rent.flat_id.0.clone(),
        })
    }
}
