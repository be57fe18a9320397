//! URL composition for shareable verification links and WhatsApp deep links.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use url::Url;

use super::domain::LinkId;

/// Public verification page URL:
/// `<origin>/payment-verification?id=<linkId>&amount=<amount>&name=<tenantName>`.
pub fn share_url(origin: &str, link_id: &LinkId, amount: Decimal, tenant_name: &str) -> String {
    let base = format!("{}/payment-verification", origin.trim_end_matches('/'));
    let params = [
        ("id", link_id.0.clone()),
        ("amount", amount.to_string()),
        ("name", tenant_name.to_string()),
    ];
    match Url::parse_with_params(&base, &params) {
        Ok(url) => url.to_string(),
        // The origin is validated at config load, so this branch only fires
        // for callers that bypass it; keep the full query shape regardless.
        Err(_) => {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &params {
                query.append_pair(key, value);
            }
            format!("{base}?{}", query.finish())
        }
    }
}

/// WhatsApp deep link: `https://wa.me/<digitsOnlyPhone>?text=<encodedMessage>`.
/// Returns `None` when the phone carries no digits at all.
pub fn wa_me_link(phone: &str, message: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let base = format!("https://wa.me/{digits}");
    let url = Url::parse_with_params(&base, [("text", message)]).ok()?;
    Some(url.to_string())
}

/// Reminder text used when an obligation carries no custom message.
pub fn default_reminder_message(tenant_name: &str, amount: Decimal, due_date: NaiveDate) -> String {
    format!(
        "Hi {tenant_name}, a gentle reminder that your rent of {amount} was due on {}. \
         Please share a payment confirmation once done. Thank you!",
        due_date.format("%d %b %Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wa_me_link_strips_everything_but_digits() {
        let link = wa_me_link("+91 (98765) 43210", "rent due").expect("link composes");
        assert!(link.starts_with("https://wa.me/919876543210?text="));
        assert!(!link.contains(' '));
    }

    #[test]
    fn wa_me_link_requires_at_least_one_digit() {
        assert!(wa_me_link("n/a", "rent due").is_none());
    }

    #[test]
    fn share_url_keeps_the_query_shape_for_unparseable_origins() {
        let id = LinkId("pl-000007".to_string());
        let url = share_url("not a url", &id, "18500".parse().unwrap(), "Ravi Sharma");
        assert!(url.contains("id=pl-000007"));
        assert!(url.contains("amount=18500"));
        assert!(url.contains("name=Ravi+Sharma"));
    }

    #[test]
    fn share_url_tolerates_trailing_slash_origins() {
        let id = LinkId("pl-000042".to_string());
        let url = share_url("https://backoffice.example/", &id, "950.50".parse().unwrap(), "Asha Rao");
        assert!(url.starts_with("https://backoffice.example/payment-verification?"));
        assert!(url.contains("id=pl-000042"));
        assert!(url.contains("amount=950.50"));
    }
}
