//! URL validation and SSRF protection for webhook endpoints.
//!
//! Validates webhook URLs against:
//! - Protocol requirements (HTTPS unless plain HTTP is allowed)
//! - SSRF protections (private/internal IP ranges, cloud metadata endpoints)
//!
//! and normalizes subscribed event lists.

use std::net::{IpAddr, Ipv6Addr};

use crate::error::WebhookError;
use crate::models::{WebhookEventType, MAX_URL_LENGTH};

/// What an endpoint URL may point at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlPolicy {
    /// Accept `http://` in addition to `https://`.
    pub allow_http: bool,
    /// Skip the private/internal host checks.
    pub allow_internal_hosts: bool,
}

impl UrlPolicy {
    /// HTTPS only, public hosts only.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// URL validation
// ---------------------------------------------------------------------------

/// Validate a webhook delivery URL.
///
/// Checks:
/// 1. URL is at most 2048 characters and parseable as an absolute URL
/// 2. Scheme is HTTPS (or HTTP if the policy allows it)
/// 3. URL has a host and carries no credentials
/// 4. Host is not a private/internal address (SSRF protection)
pub fn validate_webhook_url(url: &str, policy: UrlPolicy) -> Result<(), WebhookError> {
    if url.len() > MAX_URL_LENGTH {
        return Err(WebhookError::InvalidUrl(format!(
            "URL must be at most {MAX_URL_LENGTH} characters"
        )));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| WebhookError::InvalidUrl(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if policy.allow_http => {}
        "http" => {
            return Err(WebhookError::InvalidUrl(
                "Webhook URLs must use HTTPS".to_string(),
            ));
        }
        scheme => {
            return Err(WebhookError::InvalidUrl(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(WebhookError::InvalidUrl(
            "Webhook URLs must not embed credentials".to_string(),
        ));
    }

    let host = match parsed.host() {
        Some(url::Host::Domain(d)) => d.to_string(),
        Some(url::Host::Ipv4(ip)) => ip.to_string(),
        Some(url::Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(WebhookError::InvalidUrl("URL must have a host".to_string())),
    };

    if !policy.allow_internal_hosts {
        validate_host_not_internal(&host)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate that a host is not a private/internal address.
///
/// Blocks:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - Private networks (10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16, fc00::/7)
/// - Link-local (169.254.0.0/16, fe80::/10), which includes cloud metadata endpoints
/// - CGNAT (100.64.0.0/10)
/// - Broadcast and unspecified addresses
/// - IPv4-mapped IPv6 forms of all of the above
/// - Internal hostnames (localhost, *.localhost, *.internal, *.local)
pub fn validate_host_not_internal(host: &str) -> Result<(), WebhookError> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(WebhookError::SsrfDetected(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
        return Ok(());
    }

    let lower = host.trim_end_matches('.').to_ascii_lowercase();
    if lower == "localhost"
        || lower.ends_with(".localhost")
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(WebhookError::SsrfDetected(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

/// Check if an IP address belongs to a private/internal range.
fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = to_ipv4_mapped(v6) {
                return is_internal_ip(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // fc00::/7 unique local
                || (first & 0xffc0) == 0xfe80 // fe80::/10 link local
        }
    }
}

fn to_ipv4_mapped(v6: &Ipv6Addr) -> Option<std::net::Ipv4Addr> {
    match v6.segments() {
        [0, 0, 0, 0, 0, 0xffff, hi, lo] => Some(std::net::Ipv4Addr::new(
            (hi >> 8) as u8,
            hi as u8,
            (lo >> 8) as u8,
            lo as u8,
        )),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Event type validation
// ---------------------------------------------------------------------------

/// Validate a subscription list and return it deduplicated, first occurrence
/// order preserved.
///
/// Fails if the list is empty or names an unknown event type.
pub fn validate_event_types(event_types: &[String]) -> Result<Vec<String>, WebhookError> {
    if event_types.is_empty() {
        return Err(WebhookError::Validation(
            "At least one event type is required".to_string(),
        ));
    }

    let mut seen: Vec<WebhookEventType> = Vec::with_capacity(event_types.len());
    for et in event_types {
        let parsed = WebhookEventType::parse(et)
            .ok_or_else(|| WebhookError::Validation(format!("Unknown event type: {et}")))?;
        if !seen.contains(&parsed) {
            seen.push(parsed);
        }
    }

    Ok(seen.iter().map(|et| et.as_str().to_string()).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
