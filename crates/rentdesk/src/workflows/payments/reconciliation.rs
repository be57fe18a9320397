//! Single source of truth for the status a payment link presents as.

use chrono::{DateTime, Utc};

use super::domain::LinkStatus;

/// Map stored status, expiry, and the clock to the status shown to users.
///
/// Completion is terminal regardless of expiry. A link is expired strictly
/// after `expires_at`; at the boundary instant it is still active. `expired`
/// is never written back to storage, so callers must not compare against the
/// stored column directly.
pub fn presented_status(
    stored: LinkStatus,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LinkStatus {
    if stored == LinkStatus::Completed {
        return LinkStatus::Completed;
    }
    match expires_at {
        Some(expiry) if now > expiry => LinkStatus::Expired,
        _ => LinkStatus::Active,
    }
}
