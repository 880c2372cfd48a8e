use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Security header names
const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
const X_FRAME_OPTIONS: &str = "x-frame-options";
const STRICT_TRANSPORT_SECURITY: &str = "strict-transport-security";
const CONTENT_SECURITY_POLICY: &str = "content-security-policy";
const REFERRER_POLICY: &str = "referrer-policy";

/// Security header values
const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_VALUE: &str = "default-src 'self'; frame-ancestors 'none'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";

fn security_headers(include_hsts: bool) -> Vec<(&'static str, &'static str)> {
    let mut headers = vec![
        (X_CONTENT_TYPE_OPTIONS, NOSNIFF),
        (X_FRAME_OPTIONS, DENY),
        (CONTENT_SECURITY_POLICY, CSP_VALUE),
        (REFERRER_POLICY, REFERRER_POLICY_VALUE),
    ];
    // Only meaningful behind HTTPS.
    if include_hsts {
        headers.push((STRICT_TRANSPORT_SECURITY, HSTS_VALUE));
    }
    headers
}

/// Adds the hardening headers to every response that does not already set
/// them.
pub fn apply_security_headers(router: Router, include_hsts: bool) -> Router {
    security_headers(include_hsts)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}
