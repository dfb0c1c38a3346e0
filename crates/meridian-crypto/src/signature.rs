//! Constant-time HMAC verification for the three inbound signature schemes
//! the core accepts (§4.B, §4.G).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256_base64(secret: &[u8], message: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        mac.finalize().into_bytes(),
    ))
}

fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_str_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Commerce platform webhook verification: base64 HMAC-SHA256 of the raw
/// request body, compared against the header value supplied by the caller.
/// The signature is computed over the *exact* bytes received — callers must
/// not re-serialize the body before calling this (§4.B).
pub fn verify_webhook_body(secret: &[u8], raw_body: &[u8], header_signature: &str) -> bool {
    match hmac_sha256_base64(secret, raw_body) {
        Some(expected) => constant_time_str_eq(&expected, header_signature),
        None => false,
    }
}

/// OAuth callback query-string verification. The `hmac` parameter itself is
/// excluded from the signed message; remaining pairs are sorted
/// lexicographically by key before joining, per the platform's documented
/// scheme.
pub fn verify_oauth_query(secret: &[u8], query_pairs: &[(String, String)], hmac_value: &str) -> bool {
    let mut pairs: Vec<&(String, String)> = query_pairs
        .iter()
        .filter(|(k, _)| k != "hmac")
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    match hmac_sha256_hex(secret, message.as_bytes()) {
        Some(expected) => constant_time_str_eq(&expected, hmac_value),
        None => false,
    }
}

/// svix-style inbound mail signature verification: `v1,base64(hmac)` over
/// `"{id}.{timestamp}.{raw_body}"`, with the shared secret itself encoded as
/// `whsec_<base64>`. Accepts a header carrying multiple space-separated
/// signatures and succeeds if any one matches (svix's own rotation scheme).
pub fn verify_svix_mail(
    whsec_secret: &str,
    message_id: &str,
    timestamp: &str,
    raw_body: &[u8],
    header_signatures: &str,
) -> bool {
    let Some(encoded) = whsec_secret.strip_prefix("whsec_") else {
        return false;
    };
    let Ok(secret_bytes) = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded) else {
        return false;
    };

    let mut signed_content = Vec::with_capacity(message_id.len() + timestamp.len() + raw_body.len() + 2);
    signed_content.extend_from_slice(message_id.as_bytes());
    signed_content.push(b'.');
    signed_content.extend_from_slice(timestamp.as_bytes());
    signed_content.push(b'.');
    signed_content.extend_from_slice(raw_body);

    let Some(expected) = hmac_sha256_base64(&secret_bytes, &signed_content) else {
        return false;
    };

    header_signatures
        .split_whitespace()
        .filter_map(|candidate| candidate.strip_prefix("v1,"))
        .any(|candidate| constant_time_str_eq(&expected, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_body_accepts_matching_signature() {
        let secret = b"shop-secret";
        let body = br#"{"id":1,"topic":"orders/create"}"#;
        let sig = hmac_sha256_base64(secret, body).unwrap();
        assert!(verify_webhook_body(secret, body, &sig));
    }

    #[test]
    fn webhook_body_rejects_single_bit_flip_in_body() {
        let secret = b"shop-secret";
        let body = br#"{"id":1,"topic":"orders/create"}"#;
        let sig = hmac_sha256_base64(secret, body).unwrap();
        let mut tampered = body.to_vec();
        tampered[5] ^= 0x01;
        assert!(!verify_webhook_body(secret, &tampered, &sig));
    }

    #[test]
    fn webhook_body_rejects_wrong_secret() {
        let body = b"payload";
        let sig = hmac_sha256_base64(b"right-secret", body).unwrap();
        assert!(!verify_webhook_body(b"wrong-secret", body, &sig));
    }

    #[test]
    fn oauth_query_ignores_hmac_param_and_sorts_keys() {
        let secret = b"app-secret";
        let pairs = vec![
            ("shop".to_string(), "example.myshopify.com".to_string()),
            ("code".to_string(), "abc123".to_string()),
        ];
        let mut sorted = pairs.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let message = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let expected = hmac_sha256_hex(secret, message.as_bytes()).unwrap();

        let mut with_hmac = pairs.clone();
        with_hmac.push(("hmac".to_string(), "ignored-value".to_string()));
        assert!(verify_oauth_query(secret, &with_hmac, &expected));
    }

    #[test]
    fn oauth_query_rejects_tampered_value() {
        let secret = b"app-secret";
        let pairs = vec![("shop".to_string(), "example.myshopify.com".to_string())];
        let expected = hmac_sha256_hex(secret, b"shop=example.myshopify.com").unwrap();
        let tampered = vec![("shop".to_string(), "evil.myshopify.com".to_string())];
        assert!(!verify_oauth_query(secret, &tampered, &expected));
        let _ = pairs;
    }

    #[test]
    fn svix_mail_accepts_any_matching_signature_in_header() {
        let secret_bytes = b"0123456789abcdef0123456789abcdef";
        let whsec = format!(
            "whsec_{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, secret_bytes)
        );
        let id = "msg_123";
        let ts = "1700000000";
        let body = b"raw mime bytes";

        let mut signed = Vec::new();
        signed.extend_from_slice(id.as_bytes());
        signed.push(b'.');
        signed.extend_from_slice(ts.as_bytes());
        signed.push(b'.');
        signed.extend_from_slice(body);
        let sig = hmac_sha256_base64(secret_bytes, &signed).unwrap();

        let header = format!("v1,stale-signature-value v1,{}", sig);
        assert!(verify_svix_mail(&whsec, id, ts, body, &header));
    }

    #[test]
    fn svix_mail_rejects_when_no_signature_matches() {
        let secret_bytes = b"0123456789abcdef0123456789abcdef";
        let whsec = format!(
            "whsec_{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, secret_bytes)
        );
        assert!(!verify_svix_mail(&whsec, "id", "ts", b"body", "v1,not-a-real-signature"));
    }

    #[test]
    fn svix_mail_rejects_malformed_secret_prefix() {
        assert!(!verify_svix_mail("not-whsec-prefixed", "id", "ts", b"body", "v1,anything"));
    }
}
