use chrono::Duration;

use super::common::issued_at;
use crate::workflows::payments::domain::LinkStatus;
use crate::workflows::payments::reconciliation::presented_status;

#[test]
fn completed_is_terminal_regardless_of_expiry() {
    let now = issued_at();
    let long_past = Some(now - Duration::days(30));

    assert_eq!(
        presented_status(LinkStatus::Completed, long_past, now),
        LinkStatus::Completed
    );
    assert_eq!(
        presented_status(LinkStatus::Completed, None, now),
        LinkStatus::Completed
    );
}

#[test]
fn active_presents_expired_strictly_after_the_deadline() {
    let generated = issued_at();
    let expires = generated + Duration::days(7);

    assert_eq!(
        presented_status(LinkStatus::Active, Some(expires), generated),
        LinkStatus::Active
    );
    // Exactly at the deadline the link is still active.
    assert_eq!(
        presented_status(LinkStatus::Active, Some(expires), expires),
        LinkStatus::Active
    );
    assert_eq!(
        presented_status(LinkStatus::Active, Some(expires), expires + Duration::seconds(1)),
        LinkStatus::Expired
    );
}

#[test]
fn missing_expiry_never_expires() {
    let now = issued_at();
    assert_eq!(
        presented_status(LinkStatus::Active, None, now + Duration::days(3650)),
        LinkStatus::Active
    );
}
