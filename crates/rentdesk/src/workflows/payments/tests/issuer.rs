use chrono::Duration;
use url::Url;

use super::common::*;
use crate::workflows::payments::domain::LinkStatus;
use crate::workflows::payments::service::{
    IssueLinkRequest, PaymentWorkflowError, ValidationIssue,
};

fn issue_request(harness: &Harness) -> IssueLinkRequest {
    let tenant = tenant();
    harness.tenants.insert(tenant.clone());
    IssueLinkRequest {
        tenant_id: tenant.id,
        amount: amount("18500"),
        description: Some("November rent".to_string()),
        rent_id: None,
        expiry_days: None,
    }
}

#[test]
fn issue_applies_the_default_seven_day_window() {
    let harness = harness();
    let now = issued_at();

    let issued = harness
        .service
        .issue_link(issue_request(&harness), now)
        .expect("link issues");

    assert_eq!(issued.expires_at, now + Duration::days(7));

    let stored = harness.links.get(&issued.link_id).expect("link stored");
    assert_eq!(stored.generated_at, now);
    // Boundary: still active at the deadline, expired one second later.
    assert_eq!(stored.presented_status(issued.expires_at), LinkStatus::Active);
    assert_eq!(
        stored.presented_status(issued.expires_at + Duration::seconds(1)),
        LinkStatus::Expired
    );
}

#[test]
fn issue_rejects_non_positive_amounts_before_persisting() {
    let harness = harness();
    for raw in ["0", "-450.25"] {
        let mut request = issue_request(&harness);
        request.amount = amount(raw);

        let err = harness
            .service
            .issue_link(request, issued_at())
            .expect_err("amount must be rejected");
        assert!(matches!(
            err,
            PaymentWorkflowError::Validation(ValidationIssue::NonPositiveAmount(_))
        ));
    }
    assert_eq!(harness.links.len(), 0, "no row may be persisted");
}

#[test]
fn issue_rejects_expiry_windows_below_one_day() {
    let harness = harness();
    let mut request = issue_request(&harness);
    request.expiry_days = Some(0);

    let err = harness
        .service
        .issue_link(request, issued_at())
        .expect_err("window must be rejected");
    assert!(matches!(
        err,
        PaymentWorkflowError::Validation(ValidationIssue::ExpiryWindowTooShort(0))
    ));
    assert_eq!(harness.links.len(), 0);
}

#[test]
fn issue_rejects_oversized_expiry_windows() {
    let harness = harness();
    // i64::MAX would overflow the deadline arithmetic if it got that far.
    for days in [366, i64::MAX] {
        let mut request = issue_request(&harness);
        request.expiry_days = Some(days);

        let err = harness
            .service
            .issue_link(request, issued_at())
            .expect_err("window must be rejected");
        assert!(matches!(
            err,
            PaymentWorkflowError::Validation(ValidationIssue::ExpiryWindowTooLong(got)) if got == days
        ));
    }
    assert_eq!(harness.links.len(), 0);
}

#[test]
fn issue_rejects_unknown_tenants() {
    let harness = harness();
    let request = IssueLinkRequest {
        tenant_id: crate::workflows::payments::TenantId("t-ghost".to_string()),
        amount: amount("100"),
        description: None,
        rent_id: None,
        expiry_days: None,
    };

    let err = harness
        .service
        .issue_link(request, issued_at())
        .expect_err("tenant must resolve");
    assert!(matches!(
        err,
        PaymentWorkflowError::Validation(ValidationIssue::UnknownTenant(_))
    ));
}

#[test]
fn issued_url_embeds_id_amount_and_tenant_name() {
    let harness = harness();
    let issued = harness
        .service
        .issue_link(issue_request(&harness), issued_at())
        .expect("link issues");

    let url = Url::parse(&issued.share_url).expect("valid url");
    assert_eq!(url.path(), "/payment-verification");
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("id".to_string(), issued.link_id.0.clone())));
    assert!(pairs.contains(&("amount".to_string(), "18500".to_string())));
    assert!(pairs.contains(&("name".to_string(), "Ravi Sharma".to_string())));

    // The same URL was patched onto the stored row.
    let stored = harness.links.get(&issued.link_id).expect("link stored");
    assert_eq!(stored.share_url.as_deref(), Some(issued.share_url.as_str()));
}

#[test]
fn missing_phone_blocks_reminders_but_never_issuance() {
    let harness = harness();
    let tenant = phoneless_tenant();
    harness.tenants.insert(tenant.clone());
    let rent = rent_for(&tenant, "nov");
    harness.rents.insert(rent.clone());

    let request = IssueLinkRequest {
        tenant_id: tenant.id.clone(),
        amount: amount("9500"),
        description: None,
        rent_id: Some(rent.id.clone()),
        expiry_days: None,
    };
    harness
        .service
        .issue_link(request, issued_at())
        .expect("issuance must not require a phone number");

    let err = harness
        .service
        .send_reminders(&[rent.id], issued_at())
        .expect_err("reminder requires a phone number");
    assert!(matches!(err, PaymentWorkflowError::MissingPhone(id) if id == tenant.id));
}
