//! Logging utilities with sensitive data redaction.

/// Query params that carry credentials.
const SENSITIVE_PARAMS: &[&str] = &[
    "access_token",
    "appsecret_proof",
    "client_secret",
    "code",
    "input_token",
    "exchange_token",
];

/// Redact token, preserving a short prefix for debugging.
pub fn redact_token(token: &str) -> String {
    match token.get(..8) {
        Some(prefix) if token.len() > 8 => format!("{}...[REDACTED]", prefix),
        _ => "[REDACTED]".to_string(),
    }
}

/// Redact a URL, hiding credentials in query parameters.
pub fn redact_url(url: &str) -> String {
    let Some((base, rest)) = url.split_once('?') else {
        return url.to_string();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (rest, None),
    };

    let redacted = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SENSITIVE_PARAMS.iter().any(|s| key.eq_ignore_ascii_case(s)) => {
                format!("{}=[REDACTED]", key)
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    match fragment {
        Some(fragment) => format!("{}?{}#{}", base, redacted, fragment),
        None => format!("{}?{}", base, redacted),
    }
}
