use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rentdesk::workflows::payments::{
    AuditLog, LinkId, PaymentLink, PaymentLinkDraft, PaymentLinkRepository, PaymentTransaction,
    RentId, RentObligation, RentRepository, RepositoryError, ScreenshotStore, StorageError,
    TenantDirectory, TenantId, TenantSnapshot, WhatsAppReminderRecord,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryTenantDirectory {
    tenants: Mutex<HashMap<TenantId, TenantSnapshot>>,
}

impl InMemoryTenantDirectory {
    pub(crate) fn insert(&self, tenant: TenantSnapshot) {
        self.tenants
            .lock()
            .expect("tenant mutex poisoned")
            .insert(tenant.id.clone(), tenant);
    }
}

impl TenantDirectory for InMemoryTenantDirectory {
    fn fetch(&self, id: &TenantId) -> Result<Option<TenantSnapshot>, RepositoryError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryRentRepository {
    rents: Mutex<HashMap<RentId, RentObligation>>,
}

impl InMemoryRentRepository {
    pub(crate) fn insert(&self, rent: RentObligation) {
        self.rents
            .lock()
            .expect("rent mutex poisoned")
            .insert(rent.id.clone(), rent);
    }

    pub(crate) fn get(&self, id: &RentId) -> Option<RentObligation> {
        self.rents
            .lock()
            .expect("rent mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl RentRepository for InMemoryRentRepository {
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
pub(crate) struct InMemoryPaymentLinkRepository {
    links: Mutex<HashMap<LinkId, PaymentLink>>,
    sequence: AtomicU64,
}

impl PaymentLinkRepository for InMemoryPaymentLinkRepository {
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
        let guard = self.links.lock().expect("link mutex poisoned");
        Ok(guard.get(id).cloned())
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
pub(crate) struct InMemoryAuditLog {
    reminders: Mutex<Vec<WhatsAppReminderRecord>>,
    transactions: Mutex<Vec<PaymentTransaction>>,
}

impl InMemoryAuditLog {
    pub(crate) fn reminders(&self) -> Vec<WhatsAppReminderRecord> {
        self.reminders.lock().expect("audit mutex poisoned").clone()
    }

    pub(crate) fn transactions(&self) -> Vec<PaymentTransaction> {
        self.transactions
            .lock()
            .expect("audit mutex poisoned")
            .clone()
    }
}

impl AuditLog for InMemoryAuditLog {
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

/// Keeps screenshots in memory and hands back addressable URLs; stands in for
/// the hosted object storage bucket.
#[derive(Default)]
pub(crate) struct InMemoryScreenshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl ScreenshotStore for InMemoryScreenshotStore {
    fn store(
        &self,
        link_id: &LinkId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let key = format!("payment-screenshots/{}/{file_name}", link_id.0);
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(format!("https://storage.local/{key}"))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
