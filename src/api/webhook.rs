use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use super::handler::AppState;
use super::models::WebhookResponse;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Max clock skew accepted for svix-timestamp, in seconds
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verify a Svix-style webhook signature.
///
/// The signed content is `{id}.{timestamp}.{body}`; the header may carry
/// several space-separated `v1,<base64>` entries, any of which may match.
pub fn verify_svix(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
    now: i64,
) -> AppResult<()> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::InvalidWebhook("Invalid svix-timestamp".to_string()))?;
    if now.abs_diff(ts) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
        return Err(AppError::InvalidWebhook("Timestamp outside tolerance".to_string()));
    }

    let engine = base64::engine::general_purpose::STANDARD;
    let key = engine
        .decode(secret.strip_prefix("whsec_").unwrap_or(secret))
        .map_err(|_| AppError::Config("Webhook signing secret is not valid base64".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|_| AppError::Config("Invalid webhook signing key".to_string()))?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    let expected = engine.encode(mac.finalize().into_bytes());

    let matched = signature_header
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .any(|candidate| {
            candidate.len() == expected.len()
                && bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
        });

    if matched {
        Ok(())
    } else {
        Err(AppError::InvalidWebhook("Invalid signature".to_string()))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidWebhook("Missing svix headers".to_string()))
}

/// Identity-provider webhook
/// POST /api/webhook/clerk
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookResponse>> {
    let secret = state.webhook_secret.as_deref().ok_or_else(|| {
        warn!("SIGNING_SECRET not set - rejecting webhook");
        AppError::InvalidWebhook("Webhook verification is not configured".to_string())
    })?;

    let msg_id = header(&headers, "svix-id")?;
    let timestamp = header(&headers, "svix-timestamp")?;
    let signature = header(&headers, "svix-signature")?;

    verify_svix(secret, msg_id, timestamp, &body, signature, chrono::Utc::now().timestamp())
        .map_err(|e| {
            warn!(target: "security", "Rejected webhook {}: {}", msg_id, e);
            e
        })?;

    let event: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::InvalidWebhook("Invalid JSON payload".to_string()))?;

    info!(
        "📨 Webhook {} received: type={} id={}",
        msg_id,
        event["type"].as_str().unwrap_or("unknown"),
        event["data"]["id"].as_str().unwrap_or("-")
    );

    Ok(Json(WebhookResponse {
        success: true,
        message: "Webhook received".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_Y2xlcmstc2lnbmluZy1zZWNyZXQtMDEyMzQ1Njc4OQ==";
    const BODY: &[u8] = br#"{"type":"user.created","data":{"id":"user_123"}}"#;
    const SIGNATURE: &str = "v1,OseIwL/1V36xCEJdM3B6znZLGX26vHgbjJ7DbUC7pkE=";

    #[test]
    fn test_valid_signature() {
        assert!(verify_svix(SECRET, "msg_1", "1700000000", BODY, SIGNATURE, 1_700_000_010).is_ok());
    }

    #[test]
    fn test_secret_without_prefix() {
        let bare = SECRET.trim_start_matches("whsec_");
        assert!(verify_svix(bare, "msg_1", "1700000000", BODY, SIGNATURE, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_any_listed_signature_may_match() {
        let header = format!("v1,bm90LXRoaXMtb25l {}", SIGNATURE);
        assert!(verify_svix(SECRET, "msg_1", "1700000000", BODY, &header, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let body = br#"{"type":"user.deleted","data":{"id":"user_123"}}"#;
        let result = verify_svix(SECRET, "msg_1", "1700000000", body, SIGNATURE, 1_700_000_000);
        assert!(matches!(result, Err(AppError::InvalidWebhook(_))));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let result = verify_svix(SECRET, "msg_1", "1700000000", BODY, SIGNATURE, 1_700_000_000 + 301);
        assert!(matches!(result, Err(AppError::InvalidWebhook(_))));
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        for ts in ["-9223372036854775808", "9223372036854775807"] {
            let result = verify_svix(SECRET, "msg_1", ts, b"{}", "v1,x", 1_700_000_000);
            assert!(matches!(result, Err(AppError::InvalidWebhook(_))));
        }
    }

    #[test]
    fn test_wrong_version_prefix_rejected() {
        let header = SIGNATURE.replacen("v1,", "v2,", 1);
        assert!(verify_svix(SECRET, "msg_1", "1700000000", BODY, &header, 1_700_000_000).is_err());
    }
}
