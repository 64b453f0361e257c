//! Decoding of the bearer token's claims.
//!
//! The token is issued and signed by the backend; the client has no key and
//! only reads the expiry to decide whether the session is still usable.
//! Signature and expiry are therefore not validated here. The header must
//! still name a known signing algorithm and `exp` must be an integer;
//! anything else is reported as malformed.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("Malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    /// A token expiring at exactly `now_secs` is still valid.
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.exp < now_secs
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Decode the claims of a JWT without checking its signature or expiry.
pub fn decode_claims(token: &str) -> Result<Claims, ClaimsError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<Claims>(token.trim(), &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    /// Sign a token the way the backend would, with a key the client never sees
    pub(crate) fn token_with_exp(exp: i64) -> String {
        let claims = Claims {
            exp,
            sub: Some("42".to_string()),
            iat: Some(exp - 3600),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret"))
            .expect("encode test token")
    }

    #[test]
    fn test_decode_reads_exp() {
        let claims = decode_claims(&token_with_exp(1_900_000_000)).unwrap();
        assert_eq!(claims.exp, 1_900_000_000);
        assert_eq!(claims.sub.as_deref(), Some("42"));
    }

    #[test]
    fn test_decode_ignores_expiry() {
        // Already expired, still decodes; the session decides what to do
        let claims = decode_claims(&token_with_exp(1_000)).unwrap();
        assert!(claims.is_expired_at(2_000));
    }

    #[test]
    fn test_decode_ignores_audience() {
        let payload = serde_json::json!({"exp": 1_900_000_000_i64, "aud": "portal"});
        let token = encode(&Header::default(), &payload, &EncodingKey::from_secret(b"k")).unwrap();
        assert_eq!(decode_claims(&token).unwrap().exp, 1_900_000_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_claims("not-a-token").is_err());
        assert!(decode_claims("a.b.c").is_err());
        assert!(decode_claims("").is_err());
    }

    #[test]
    fn test_decode_requires_exp() {
        let payload = serde_json::json!({"sub": "42"});
        let token = encode(&Header::default(), &payload, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(decode_claims(&token).is_err());
    }

    #[test]
    fn test_unknown_header_alg_is_malformed() {
        // {"alg":"none"} . {"exp":1900000000} . empty signature
        let token = "eyJhbGciOiJub25lIn0.eyJleHAiOjE5MDAwMDAwMDB9.";
        assert!(matches!(decode_claims(token), Err(ClaimsError::Malformed(_))));
    }

    #[test]
    fn test_fractional_exp_is_malformed() {
        let payload = serde_json::json!({"exp": 1_900_000_000.5_f64});
        let token = encode(&Header::default(), &payload, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(decode_claims(&token).is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims { exp: 100, sub: None, iat: None };
        assert!(!claims.is_expired_at(99));
        assert!(!claims.is_expired_at(100));
        assert!(claims.is_expired_at(101));
    }
}
