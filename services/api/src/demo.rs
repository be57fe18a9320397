use crate::infra::{
    InMemoryAuditLog, InMemoryPaymentLinkRepository, InMemoryRentRepository,
    InMemoryScreenshotStore, InMemoryTenantDirectory,
};
use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use rentdesk::config::PaymentLinkConfig;
use rentdesk::error::AppError;
use rentdesk::workflows::payments::{
    FlatId, IssueLinkRequest, PaymentWorkflowService, RentId, RentObligation, ScreenshotUpload,
    TenantId, TenantSnapshot,
};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Rent amount for the demo obligation (defaults to 18500)
    #[arg(long)]
    pub(crate) amount: Option<Decimal>,
    /// Due date for the demo obligation (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) due_date: Option<NaiveDate>,
    /// Expiry window for the issued payment link in days
    #[arg(long)]
    pub(crate) expiry_days: Option<i64>,
    /// Stop after issuing the link and composing the reminder
    #[arg(long)]
    pub(crate) skip_verification: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let amount = args
        .amount
        .unwrap_or_else(|| Decimal::new(18500, 0));
    let due_date = args.due_date.unwrap_or_else(|| Local::now().date_naive());

    let tenants = Arc::new(InMemoryTenantDirectory::default());
    let rents = Arc::new(InMemoryRentRepository::default());
    let links = Arc::new(InMemoryPaymentLinkRepository::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = PaymentWorkflowService::new(
        tenants.clone(),
        rents.clone(),
        links,
        audit.clone(),
        Arc::new(InMemoryScreenshotStore::default()),
        PaymentLinkConfig::default(),
    );

    let tenant = TenantSnapshot {
        id: TenantId("t-demo".to_string()),
        full_name: "Priya Nair".to_string(),
        phone: Some("+91 98100 24680".to_string()),
        flat_id: Some(FlatId("F-3B".to_string())),
    };
    tenants.insert(tenant.clone());
    let rent = RentObligation::new(
        RentId("rent-demo".to_string()),
        tenant.id.clone(),
        FlatId("F-3B".to_string()),
        due_date,
        amount,
    );
    rents.insert(rent.clone());

    println!("Payment link lifecycle demo");
    println!("Tenant {} | flat F-3B | rent {amount} due {due_date}", tenant.full_name);

    let issued = service.issue_link(
        IssueLinkRequest {
            tenant_id: tenant.id.clone(),
            amount,
            description: Some("Monthly rent".to_string()),
            rent_id: Some(rent.id.clone()),
            expiry_days: args.expiry_days,
        },
        Utc::now(),
    )?;
    println!("\nIssued link {} (expires {})", issued.link_id.0, issued.expires_at);
    println!("Share URL: {}", issued.share_url);

    let reminders = service.send_reminders(&[rent.id.clone()], Utc::now())?;
    for reminder in &reminders {
        println!("\nReminder for {} -> {}", reminder.tenant_id.0, reminder.phone);
        println!("Open in WhatsApp: {}", reminder.wa_link);
    }

    if args.skip_verification {
        return Ok(());
    }

    let upload = ScreenshotUpload {
        file_name: "upi-confirmation.jpg".to_string(),
        media_type: "image/jpeg".to_string(),
        bytes: vec![0u8; 64 * 1024],
    };
    let view = service.verify_link(
        &issued.link_id,
        upload,
        Some("UPI ref 884201".to_string()),
        Utc::now(),
    )?;
    println!("\nVerification accepted -> status {}", view.status);
    if let Some(url) = &view.screenshot_url {
        println!("Screenshot stored at {url}");
    }

    // Completion never reconciles the rent by itself.
    let still_pending = rents
        .get(&rent.id)
        .map(|rent| !rent.is_paid())
        .unwrap_or(false);
    println!("Rent still pending after verification: {still_pending}");

    let outcome = service.mark_paid_bulk(&[rent.id.clone()], Local::now().date_naive())?;
    println!(
        "\nMarked {} obligation(s) paid on {} ({} audit row(s) written)",
        outcome.updated.len(),
        outcome.paid_on,
        audit.transactions().len()
    );
    println!("Reminder history entries: {}", audit.reminders().len());

    Ok(())
}
