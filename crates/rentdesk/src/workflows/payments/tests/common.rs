use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::PaymentLinkConfig;
use crate::workflows::payments::domain::{
    FlatId, LinkId, PaymentLink, PaymentLinkDraft, PaymentTransaction, RentId, RentObligation,
    TenantId, TenantSnapshot, WhatsAppReminderRecord,
};
use crate::workflows::payments::repository::{
    AuditLog, PaymentLinkRepository, RentRepository, RepositoryError, ScreenshotStore,
    StorageError, TenantDirectory,
};
use crate::workflows::payments::router::payment_router;
use crate::workflows::payments::service::PaymentWorkflowService;

pub(super) type MemoryService = PaymentWorkflowService<
    MemoryDirectory,
    MemoryRents,
    MemoryLinks,
    MemoryAudit,
    MemoryScreenshots,
>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) tenants: Arc<MemoryDirectory>,
    pub(super) rents: Arc<MemoryRents>,
    pub(super) links: Arc<MemoryLinks>,
    pub(super) audit: Arc<MemoryAudit>,
    pub(super) screenshots: Arc<MemoryScreenshots>,
}

pub(super) fn harness() -> Harness {
    harness_with_screenshots(Arc::new(MemoryScreenshots::default()))
}

pub(super) fn harness_with_screenshots(screenshots: Arc<MemoryScreenshots>) -> Harness {
    let tenants = Arc::new(MemoryDirectory::default());
    let rents = Arc::new(MemoryRents::default());
    let links = Arc::new(MemoryLinks::default());
    let audit = Arc::new(MemoryAudit::default());
    let service = Arc::new(PaymentWorkflowService::new(
        tenants.clone(),
        rents.clone(),
        links.clone(),
        audit.clone(),
        screenshots.clone(),
        link_config(),
    ));
    Harness {
        service,
        tenants,
        rents,
        links,
        audit,
        screenshots,
    }
}

pub(super) fn link_config() -> PaymentLinkConfig {
    PaymentLinkConfig {
        public_origin: "https://backoffice.example".to_string(),
        default_expiry_days: 7,
        max_screenshot_bytes: 5 * 1024 * 1024,
    }
}

pub(super) fn amount(raw: &str) -> Decimal {
    raw.parse().expect("valid decimal")
}

pub(super) fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).single().expect("valid timestamp")
}

pub(super) fn due_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 5).expect("valid date")
}

pub(super) fn tenant() -> TenantSnapshot {
    TenantSnapshot {
        id: TenantId("t-ravi".to_string()),
        full_name: "Ravi Sharma".to_string(),
        phone: Some("+91 98765 43210".to_string()),
        flat_id: Some(FlatId("F-101".to_string())),
    }
}

pub(super) fn phoneless_tenant() -> TenantSnapshot {
    TenantSnapshot {
        id: TenantId("t-meera".to_string()),
        full_name: "Meera Iyer".to_string(),
        phone: None,
        flat_id: Some(FlatId("F-204".to_string())),
    }
}

pub(super) fn rent_for(tenant: &TenantSnapshot, suffix: &str) -> RentObligation {
    RentObligation::new(
        RentId(format!("rent-{suffix}")),
        tenant.id.clone(),
        tenant.flat_id.clone().expect("tenant has flat"),
        due_date(),
        amount("18500"),
    )
}

pub(super) fn jpeg_upload(megabytes: usize) -> crate::workflows::payments::ScreenshotUpload {
    crate::workflows::payments::ScreenshotUpload {
        file_name: "payment.jpg".to_string(),
        media_type: "image/jpeg".to_string(),
        bytes: vec![0u8; megabytes * 1024 * 1024],
    }
}

pub(super) fn png_upload(megabytes: usize) -> crate::workflows::payments::ScreenshotUpload {
    crate::workflows::payments::ScreenshotUpload {
        file_name: "payment.png".to_string(),
        media_type: "image/png".to_string(),
        bytes: vec![0u8; megabytes * 1024 * 1024],
    }
}

pub(super) fn router_for(harness: &Harness) -> axum::Router {
    payment_router(harness.service.clone())
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    tenants: Mutex<HashMap<TenantId, TenantSnapshot>>,
}

impl MemoryDirectory {
    pub(super) fn insert(&self, tenant: TenantSnapshot) {
        self.tenants
            .lock()
            .expect("directory mutex poisoned")
            .insert(tenant.id.clone(), tenant);
    }

    pub(super) fn reassign(&self, id: &TenantId, flat: Option<FlatId>) {
        let mut guard = self.tenants.lock().expect("directory mutex poisoned");
        if let Some(tenant) = guard.get_mut(id) {
            tenant.flat_id = flat;
        }
    }
}

impl TenantDirectory for MemoryDirectory {
    fn fetch(&self, id: &TenantId) -> Result<Option<TenantSnapshot>, RepositoryError> {
        let guard = self.tenants.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryRents {
    rents: Mutex<HashMap<RentId, RentObligation>>,
}

impl MemoryRents {
    pub(super) fn insert(&self, rent: RentObligation) {
        self.rents
            .lock()
            .expect("rent mutex poisoned")
            .insert(rent.id.clone(), rent);
    }

    pub(super) fn get(&self, id: &RentId) -> Option<RentObligation> {
        self.rents
            .lock()
            .expect("rent mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl RentRepository for MemoryRents {
    fn fetch(&self, id: &RentId) -> Result<Option<RentObligation>, RepositoryError> {
        Ok(self.get(id))
    }

    fn update(&self, rent: RentObligation) -> Result<(), RepositoryError> {
        let mut guard = self.rents.lock().expect("rent mutex poisoned");
        if guard.contains_key(&rent.id) {
            guard.insert(rent.id.clone(), rent);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn mark_paid(&self, ids: &[RentId], on: NaiveDate) -> Result<(), RepositoryError> {
        let mut guard = self.rents.lock().expect("rent mutex poisoned");
        for id in ids {
            let rent = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            rent.mark_paid(on);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryLinks {
    links: Mutex<BTreeMap<LinkId, PaymentLink>>,
    sequence: AtomicU64,
}

impl MemoryLinks {
    pub(super) fn get(&self, id: &LinkId) -> Option<PaymentLink> {
        self.links
            .lock()
            .expect("link mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn len(&self) -> usize {
        self.links.lock().expect("link mutex poisoned").len()
    }
}

impl PaymentLinkRepository for MemoryLinks {
    fn create(&self, draft: PaymentLinkDraft) -> Result<PaymentLink, RepositoryError> {
        let id = LinkId(format!(
            "pl-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        let link = PaymentLink::from_draft(id.clone(), draft);
        self.links
            .lock()
            .expect("link mutex poisoned")
            .insert(id, link.clone());
        Ok(link)
    }

    fn update(&self, link: PaymentLink) -> Result<(), RepositoryError> {
        let mut guard = self.links.lock().expect("link mutex poisoned");
        if guard.contains_key(&link.id) {
            guard.insert(link.id.clone(), link);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LinkId) -> Result<Option<PaymentLink>, RepositoryError> {
        Ok(self.get(id))
    }

    fn list(&self) -> Result<Vec<PaymentLink>, RepositoryError> {
        let guard = self.links.lock().expect("link mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn for_rent(&self, rent_id: &RentId) -> Result<Vec<PaymentLink>, RepositoryError> {
        let guard = self.links.lock().expect("link mutex poisoned");
        Ok(guard
            .values()
            .filter(|link| link.rent_id.as_ref() == Some(rent_id))
            .cloned()
            .collect())
    }

    fn delete(&self, id: &LinkId) -> Result<(), RepositoryError> {
        let mut guard = self.links.lock().expect("link mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    reminders: Mutex<Vec<WhatsAppReminderRecord>>,
    transactions: Mutex<Vec<PaymentTransaction>>,
}

impl MemoryAudit {
    pub(super) fn reminders(&self) -> Vec<WhatsAppReminderRecord> {
        self.reminders.lock().expect("audit mutex poisoned").clone()
    }

    pub(super) fn transactions(&self) -> Vec<PaymentTransaction> {
        self.transactions
            .lock()
            .expect("audit mutex poisoned")
            .clone()
    }
}

impl AuditLog for MemoryAudit {
    fn append_reminder(&self, record: WhatsAppReminderRecord) -> Result<(), RepositoryError> {
        self.reminders
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }

    fn append_transaction(&self, record: PaymentTransaction) -> Result<(), RepositoryError> {
        self.transactions
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryScreenshots {
    fail: bool,
    stored: Mutex<Vec<(LinkId, String)>>,
}

impl MemoryScreenshots {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            stored: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn stored(&self) -> Vec<(LinkId, String)> {
        self.stored.lock().expect("screenshot mutex poisoned").clone()
    }
}

impl ScreenshotStore for MemoryScreenshots {
    fn store(
        &self,
        link_id: &LinkId,
        file_name: &str,
        _bytes: &[u8],
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Unavailable("bucket offline".to_string()));
        }
        let url = format!(
            "https://storage.example/payment-screenshots/{}/{file_name}",
            link_id.0
        );
        self.stored
            .lock()
            .expect("screenshot mutex poisoned")
            .push((link_id.clone(), url.clone()));
        Ok(url)
    }
}
