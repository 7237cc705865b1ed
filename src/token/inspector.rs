use anyhow::{anyhow, Result};
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::helpers::time::{now_i64, unix_to_datetime, SECONDS_PER_MINUTE};
use crate::token::claims::TokenClaims;

/// Tokens are considered expired this many minutes before their real `exp`,
/// so a refresh can finish before the server starts rejecting them.
pub const DEFAULT_BUFFER_MINUTES: u64 = 5;

/// Decode the payload segment of a `header.payload.signature` token.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow!("invalid token format: expected 3 segments, got {}", parts.len()));
    }

    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| anyhow!("base64 decode error: {}", e))?;

    let json: Value = serde_json::from_slice(&decoded)
        .map_err(|e| anyhow!("invalid token payload: {}", e))?;
    if !json.is_object() {
        return Err(anyhow!("invalid token payload: not a JSON object"));
    }

    Ok(TokenClaims::from_payload(&json))
}

/// `exp` of the token, `None` when it is missing or not a representable
/// instant, so every check below agrees on which tokens are unusable.
fn expiration_unix_ts(token: &str) -> Option<i64> {
    let exp = match decode_claims(token) {
        Ok(claims) => claims.exp?,
        Err(err) => {
            debug!(error = %err, "token could not be decoded");
            return None;
        }
    };
    if unix_to_datetime(exp).is_none() {
        debug!(exp, "token exp is out of range");
        return None;
    }
    Some(exp)
}

/// `true` when the token is undecodable, has no `exp`, or expires within
/// `buffer_minutes` from now.
pub fn is_token_expired(token: &str, buffer_minutes: u64) -> bool {
    is_token_expired_at(token, buffer_minutes, now_i64())
}

pub fn is_token_expired_at(token: &str, buffer_minutes: u64, now: i64) -> bool {
    let buffer_seconds = i64::try_from(buffer_minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(SECONDS_PER_MINUTE);

    match expiration_unix_ts(token) {
        Some(exp) => now.saturating_add(buffer_seconds) >= exp,
        None => true,
    }
}

/// Absolute expiry instant, `None` when the token carries no usable `exp`.
pub fn get_token_expiration(token: &str) -> Option<DateTime<Utc>> {
    expiration_unix_ts(token).and_then(unix_to_datetime)
}

/// Whole minutes left before expiry, never negative.
pub fn get_time_until_expiration(token: &str) -> u64 {
    get_time_until_expiration_at(token, now_i64())
}

pub fn get_time_until_expiration_at(token: &str, now: i64) -> u64 {
    expiration_unix_ts(token)
        .map(|exp| exp.saturating_sub(now))
        .filter(|remaining| *remaining > 0)
        .map(|remaining| (remaining / SECONDS_PER_MINUTE) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Utc;
    use serde_json::{json, Value};

    use super::*;

    pub(crate) fn sample_jwt(payload: Value) -> String {
        // unsigned token, signature segment is never inspected
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, payload)
    }

    pub(crate) fn jwt_expiring_in(seconds: i64) -> String {
        let now = Utc::now().timestamp();
        sample_jwt(json!({
            "id": "64f1c0ffee",
            "email": "student@example.com",
            "role": "student",
            "iat": now,
            "exp": now + seconds
        }))
    }

    #[test]
    fn buffer_boundaries() {
        let now = 1_700_000_000;
        let token = |exp: i64| sample_jwt(json!({ "exp": exp }));

        // strictly beyond the buffer
        assert!(!is_token_expired_at(&token(now + 5 * 60 + 1), 5, now));
        // exactly at the buffer edge
        assert!(is_token_expired_at(&token(now + 5 * 60), 5, now));
        assert!(is_token_expired_at(&token(now + 60), 5, now));
        assert!(is_token_expired_at(&token(now - 3600), 5, now));

        // zero buffer compares against the real expiry
        assert!(!is_token_expired_at(&token(now + 1), 0, now));
        assert!(is_token_expired_at(&token(now), 0, now));
    }

    #[test]
    fn expiring_within_buffer_reports_remaining_minutes() {
        let now = 1_700_000_000;
        let token = sample_jwt(json!({ "exp": now + 120 }));

        assert!(is_token_expired_at(&token, DEFAULT_BUFFER_MINUTES, now));
        assert_eq!(get_time_until_expiration_at(&token, now), 2);
    }

    #[test]
    fn minutes_are_floored_and_never_negative() {
        let now = 1_700_000_000;
        assert_eq!(get_time_until_expiration_at(&sample_jwt(json!({"exp": now + 179})), now), 2);
        assert_eq!(get_time_until_expiration_at(&sample_jwt(json!({"exp": now + 59})), now), 0);
        assert_eq!(get_time_until_expiration_at(&sample_jwt(json!({"exp": now - 7200})), now), 0);
    }

    #[test]
    fn malformed_tokens_fail_closed() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let malformed = vec![
            "".to_string(),
            "new".to_string(),
            "a.b".to_string(),
            "a.b.c.d".to_string(),
            format!("{}.!!!not-base64!!!.sig", header),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode("not json")),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode("[1,2,3]")),
            sample_jwt(json!({ "email": "no-exp@example.com" })),
            sample_jwt(json!({ "exp": "soon" })),
            sample_jwt(json!({ "exp": 100_000_000_000_000_000_i64 })),
        ];

        for token in malformed {
            assert!(is_token_expired(&token, DEFAULT_BUFFER_MINUTES), "{token}");
            assert!(get_token_expiration(&token).is_none(), "{token}");
            assert_eq!(get_time_until_expiration(&token), 0, "{token}");
        }
    }

    #[test]
    fn expiration_instant_matches_claim() {
        let token = sample_jwt(json!({ "exp": 1_900_000_000 }));
        let instant = get_token_expiration(&token).unwrap();
        assert_eq!(instant.timestamp(), 1_900_000_000);
    }

    #[test]
    fn decodes_padded_and_standard_alphabet_payloads() {
        use base64::engine::general_purpose::STANDARD;

        let payload = STANDARD.encode(r#"{"id":"u1","exp":1900000000}"#);
        let token = format!("h.{}.s", payload);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.id.as_deref(), Some("u1"));
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn fresh_token_against_wall_clock() {
        let token = jwt_expiring_in(3600);
        assert!(!is_token_expired(&token, DEFAULT_BUFFER_MINUTES));
        let minutes = get_time_until_expiration(&token);
        assert!((59..=60).contains(&minutes));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("student@example.com"));
        assert_eq!(claims.role.as_deref(), Some("student"));
    }
}
