//! Tenant identifier derivation.
//!
//! # Responsibilities
//! - Derive a tenant id from the request's hostname, path, or header
//! - Fall back to the configured default id when nothing matches
//!
//! # Design Decisions
//! - Precedence is fixed: host label, then path segment, then header,
//!   then fallback; the first rule that matches wins
//! - The host rule only applies to dotted, non-IP hostnames, so requests
//!   addressed by IP or bare hostname fall through to the later rules
//! - The protected prefix segment never derives a tenant id; `/api/...`
//!   must resolve through the header or the fallback

use std::net::Ipv4Addr;

/// Derive the tenant id for a request.
///
/// `host_header` is the raw Host header, `path` the request path, and
/// `header_value` the configured tenant header's value, when present.
pub fn derive_tenant_id(
    host_header: Option<&str>,
    path: &str,
    header_value: Option<&str>,
    protected_prefix: &str,
    fallback_id: &str,
) -> String {
    if let Some(label) = host_label(host_header) {
        return label;
    }
    if let Some(segment) = path_segment(path, protected_prefix) {
        return segment;
    }
    if let Some(value) = header_value.map(str::trim).filter(|v| !v.is_empty()) {
        return value.to_string();
    }
    fallback_id.to_string()
}

/// The leading label of a dotted, non-IP hostname.
fn host_label(host_header: Option<&str>) -> Option<String> {
    let raw = host_header?.trim();
    if raw.is_empty() || raw.starts_with('[') {
        // IPv6 literals carry no subdomain label.
        return None;
    }
    let hostname = raw.split(':').next().unwrap_or(raw);
    if hostname.parse::<Ipv4Addr>().is_ok() {
        return None;
    }
    let (label, rest) = hostname.split_once('.')?;
    if label.is_empty() || rest.is_empty() {
        return None;
    }
    Some(label.to_lowercase())
}

/// The leading path segment, unless it is the protected prefix segment.
fn path_segment(path: &str, protected_prefix: &str) -> Option<String> {
    let segment = path.trim_start_matches('/').split('/').next()?;
    if segment.is_empty() {
        return None;
    }
    let protected = protected_prefix.trim_matches('/').split('/').next().unwrap_or("");
    if segment == protected {
        return None;
    }
    Some(segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(host: Option<&str>, path: &str, header: Option<&str>) -> String {
        derive_tenant_id(host, path, header, "/api", "default-tenant")
    }

    #[test]
    fn test_host_label_wins_over_path_and_header() {
        assert_eq!(
            derive(Some("acme.example.com"), "/widgets", Some("other")),
            "acme"
        );
        assert_eq!(derive(Some("ACME.example.com:8080"), "/", None), "acme");
    }

    #[test]
    fn test_path_segment_when_host_rule_fails() {
        assert_eq!(derive(Some("127.0.0.1:8080"), "/acme/plans", None), "acme");
        assert_eq!(derive(Some("localhost:8080"), "/acme", Some("other")), "acme");
    }

    #[test]
    fn test_protected_segment_never_derives() {
        assert_eq!(derive(Some("127.0.0.1"), "/api/anything", None), "default-tenant");
        assert_eq!(
            derive(Some("[::1]:8080"), "/api/things", Some("acme")),
            "acme"
        );
    }

    #[test]
    fn test_header_and_fallback() {
        assert_eq!(derive(Some("localhost"), "/", Some("beta")), "beta");
        assert_eq!(derive(Some("localhost"), "/", Some("  ")), "default-tenant");
        assert_eq!(derive(None, "/", None), "default-tenant");
    }

    #[test]
    fn test_degenerate_hostnames() {
        assert_eq!(derive(Some(".example.com"), "/", None), "default-tenant");
        assert_eq!(derive(Some("acme."), "/", None), "default-tenant");
    }
}
