use crate::auth::context::{AuthContext, SubjectId};
use crate::config::AuthConfig;
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, decode, Header, EncodingKey, DecodingKey, Validation, Algorithm};
use serde::{Deserialize, Serialize};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: SubjectId,
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
}

/// Issues and verifies HS256 bearer credentials.
///
/// Holds only immutable key material, so one instance is shared across all
/// workers behind an `Arc`.
pub struct TokenGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl TokenGate {
    pub fn new(secret: &[u8], token_ttl: Duration, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::hours(config.token_expiry_hours),
            config.leeway_seconds,
        )
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn issue(&self, subject: SubjectId) -> Result<String, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit clock.
    pub fn issue_at(&self, subject: SubjectId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            user_id: subject,
            exp: (now + self.token_ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks a raw `Authorization` header value.
    ///
    /// A missing or blank header is rejected before any decoding happens.
    pub fn verify(&self, authorization: Option<&str>) -> Result<AuthContext, AuthError> {
        let header = authorization
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let token = header
            .strip_prefix(BEARER_PREFIX)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedCredential)?;

        let claims = self.verify_token(token)?;
        AuthContext::try_from(claims)
    }

    /// Decodes a bare token (no scheme marker) and validates signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn gate(secret: &str) -> TokenGate {
        TokenGate::new(secret.as_bytes(), Duration::hours(24), 0)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let gate = gate("test_secret");

        for id in [0u64, 1, 42, u32::MAX as u64, u64::MAX] {
            let token = gate.issue(SubjectId(id)).unwrap();
            let ctx = gate.verify(Some(&bearer(&token))).unwrap();
            assert_eq!(ctx.subject(), SubjectId(id));
        }
    }

    #[test]
    fn test_claims_carry_ttl() {
        let gate = gate("test_secret");
        let now = Utc::now();
        let token = gate.issue_at(SubjectId(7), now).unwrap();

        let claims = gate.verify_token(&token).unwrap();
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, claims.iat + 24 * 60 * 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = gate("secret-A").issue(SubjectId(1)).unwrap();

        let result = gate("secret-B").verify(Some(&bearer(&token)));
        assert_eq!(result.unwrap_err(), AuthError::InvalidSignature);
    }

    #[test]
    fn test_expired_token_rejected() {
        let gate = gate("test_secret");
        let issued = Utc::now() - Duration::hours(25);
        let token = gate.issue_at(SubjectId(1), issued).unwrap();

        let result = gate.verify(Some(&bearer(&token)));
        assert_eq!(result.unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_leeway_accepts_recently_expired() {
        let gate = TokenGate::new(b"test_secret", Duration::seconds(60), 300);
        let issued = Utc::now() - Duration::seconds(120);
        let token = gate.issue_at(SubjectId(3), issued).unwrap();

        assert!(gate.verify(Some(&bearer(&token))).is_ok());
    }

    #[test]
    fn test_missing_header() {
        let gate = gate("test_secret");
        assert_eq!(gate.verify(None).unwrap_err(), AuthError::MissingCredential);
        assert_eq!(gate.verify(Some("")).unwrap_err(), AuthError::MissingCredential);
        assert_eq!(gate.verify(Some("   ")).unwrap_err(), AuthError::MissingCredential);
    }

    #[test]
    fn test_malformed_header() {
        let gate = gate("test_secret");
        let token = gate.issue(SubjectId(1)).unwrap();

        for header in [
            token.clone(),
            format!("Basic {}", token),
            format!("bearer{}", token),
            "Bearer ".to_string(),
            "Bearer not-a-jwt".to_string(),
            "Bearer a.b.c".to_string(),
        ] {
            assert_eq!(
                gate.verify(Some(&header)).unwrap_err(),
                AuthError::MalformedCredential,
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn test_token_without_expiry_rejected() {
        #[derive(Serialize)]
        struct NoExp {
            user_id: u64,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoExp { user_id: 1 },
            &EncodingKey::from_secret(b"test_secret"),
        )
        .unwrap();

        assert!(gate("test_secret").verify(Some(&bearer(&token))).is_err());
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = Utc::now();
        let claims = Claims {
            user_id: SubjectId(1),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test_secret"),
        )
        .unwrap();

        assert!(gate("test_secret").verify(Some(&bearer(&token))).is_err());
    }

    #[test]
    fn test_single_byte_tamper_rejected() {
        let gate = gate("test_secret");
        let token = gate.issue(SubjectId(99)).unwrap();

        for (i, c) in token.char_indices() {
            if c == '.' {
                continue;
            }
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, &replacement.to_string());

            assert!(
                gate.verify(Some(&bearer(&tampered))).is_err(),
                "tampered byte {} still verified",
                i
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_verify() {
        let gate = Arc::new(gate("test_secret"));
        let header = bearer(&gate.issue(SubjectId(1234)).unwrap());

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let gate = gate.clone();
                let header = header.clone();
                tokio::spawn(async move { gate.verify(Some(&header)) })
            })
            .collect();

        for handle in handles {
            let ctx = handle.await.unwrap().unwrap();
            assert_eq!(ctx.subject(), SubjectId(1234));
        }
    }
}
