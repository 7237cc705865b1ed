use serde::Serialize;
use serde_json::Value;

/// Claims the client cares about. Every field is optional: the payload is
/// produced by the server and this side only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenClaims {
    pub id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<i64>,
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Lenient extraction from a decoded payload. A claim of an unexpected
    /// type is treated as absent instead of failing the whole token.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            id: payload
                .get("id")
                .or_else(|| payload.get("sub"))
                .and_then(value_to_string),
            email: payload.get("email").and_then(Value::as_str).map(str::to_owned),
            role: payload.get("role").and_then(Value::as_str).map(str::to_owned),
            iat: payload.get("iat").and_then(value_to_epoch),
            exp: payload.get("exp").and_then(value_to_epoch),
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// NumericDate may carry a fractional part
fn value_to_epoch(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}
