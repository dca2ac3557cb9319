//! HS512 JSON Web Tokens.
//!
//! Secrets are base64 encoded raw HMAC keys as produced by [`create_key`]. Signing
//! reports errors; verification never does and answers `None` for any token it cannot
//! accept, so handlers decide how to respond (usually `AccessDenied`).

use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ErrorCondition, Exception};
use crate::server::HandlerRequest;

/// Size of keys generated by [`create_key`]: the SHA-512 block size.
pub const KEY_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("secret is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// `aud` claim: a single audience or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Registered claims plus any extra fields.
///
/// `exp`, `nbf` and `iat` are seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Extra checks applied by [`verify`]. Expiry and not-before are always checked when
/// present.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Accepted audiences; when `None` the `aud` claim is ignored
    pub audience: Option<Vec<String>>,
    /// Accepted issuers
    pub issuer: Option<Vec<String>>,
    /// Required subject
    pub subject: Option<String>,
    /// Clock skew tolerance in seconds for `exp` and `nbf`
    pub leeway: u64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            audience: None,
            issuer: None,
            subject: None,
            leeway: 1,
        }
    }
}

/// Generate a random key, base64 encoded.
#[must_use]
pub fn create_key() -> String {
    let mut key = vec![0u8; KEY_LEN];
    rand::rng().fill_bytes(&mut key);
    general_purpose::STANDARD.encode(key)
}

fn import_key(secret: &str) -> Result<Vec<u8>, JwtError> {
    Ok(general_purpose::STANDARD.decode(secret.trim())?)
}

/// Sign `payload` with HS512.
pub fn sign<T: Serialize>(payload: &T, secret: &str) -> Result<String, JwtError> {
    let key = import_key(secret)?;
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        payload,
        &EncodingKey::from_secret(&key),
    )?;
    Ok(token)
}

/// Verify a token and decode its claims. Any failure yields `None`.
#[must_use]
pub fn verify<T: DeserializeOwned>(token: &str, secret: &str, options: &VerifyOptions) -> Option<T> {
    let key = match import_key(secret) {
        Ok(k) => k,
        Err(e) => {
            debug!(error = %e, "JWT verification failed: unusable secret");
            return None;
        }
    };

    let mut validation = Validation::new(Algorithm::HS512);
    validation.leeway = options.leeway;
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    match &options.audience {
        Some(aud) => validation.set_audience(aud.as_slice()),
        None => validation.validate_aud = false,
    }
    if let Some(iss) = &options.issuer {
        validation.set_issuer(iss.as_slice());
    }
    validation.sub = options.subject.clone();

    match jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(&key), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!(error = %e, "JWT verification failed");
            None
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(req: &HandlerRequest) -> Option<&str> {
    req.get_header("authorization")
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify the request's bearer token, answering `403 Access Denied` when it is missing or
/// invalid.
pub fn authorize<T: DeserializeOwned>(
    req: &HandlerRequest,
    secret: &str,
    options: &VerifyOptions,
) -> Result<T, Exception> {
    bearer_token(req)
        .and_then(|token| verify(token, secret, options))
        .ok_or_else(|| Exception::new(ErrorCondition::AccessDenied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }

    #[test]
    fn test_sign_and_verify() {
        let secret = create_key();
        let mut claims = Claims {
            sub: Some("user-1".to_string()),
            exp: Some(now() + 60),
            ..Claims::default()
        };
        claims.extra.insert("role".to_string(), json!("admin"));

        let token = sign(&claims, &secret).expect("sign");
        assert_eq!(token.split('.').count(), 3);

        let decoded: Claims = verify(&token, &secret, &VerifyOptions::default()).expect("verify");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_header_is_hs512() {
        let token = sign(&json!({"a": 1}), &create_key()).expect("sign");
        let header = jsonwebtoken::decode_header(&token).expect("header");
        assert_eq!(header.alg, Algorithm::HS512);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign(&json!({"sub": "x"}), &create_key()).expect("sign");
        assert!(verify::<Claims>(&token, &create_key(), &VerifyOptions::default()).is_none());
    }

    #[test]
    fn test_expired_and_not_yet_valid() {
        let secret = create_key();
        let expired = sign(&json!({"exp": now() - 120}), &secret).expect("sign");
        assert!(verify::<Claims>(&expired, &secret, &VerifyOptions::default()).is_none());

        let future = sign(&json!({"nbf": now() + 120}), &secret).expect("sign");
        assert!(verify::<Claims>(&future, &secret, &VerifyOptions::default()).is_none());
    }

    #[test]
    fn test_audience() {
        let secret = create_key();
        let token = sign(&json!({"aud": "api"}), &secret).expect("sign");
        let ok = VerifyOptions {
            audience: Some(vec!["api".to_string()]),
            ..VerifyOptions::default()
        };
        let bad = VerifyOptions {
            audience: Some(vec!["web".to_string()]),
            ..VerifyOptions::default()
        };
        assert!(verify::<Claims>(&token, &secret, &ok).is_some());
        assert!(verify::<Claims>(&token, &secret, &bad).is_none());
    }

    #[test]
    fn test_invalid_secret() {
        assert!(matches!(
            sign(&json!({}), "***not base64***"),
            Err(JwtError::InvalidKey(_))
        ));
        assert!(verify::<Claims>("a.b.c", "***", &VerifyOptions::default()).is_none());
    }

    #[test]
    fn test_authorize() {
        let secret = create_key();
        let token = sign(&json!({"sub": "u"}), &secret).expect("sign");

        let req = HandlerRequest::get("/").with_header("Authorization", format!("Bearer {token}"));
        let claims: Claims = authorize(&req, &secret, &VerifyOptions::default()).expect("authorized");
        assert_eq!(claims.sub.as_deref(), Some("u"));

        let anon = HandlerRequest::get("/");
        let err = authorize::<Claims>(&anon, &secret, &VerifyOptions::default()).unwrap_err();
        assert_eq!(err.response().status, 403);
    }
}
