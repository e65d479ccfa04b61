use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Utc};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::service::Claims;
use crate::error::{AppError, AuthError};

/// Identity a credential attests to (the user's primary key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped identity established by the auth middleware.
///
/// Stored in request extensions on success and taken by handlers as an
/// extractor argument. Routes outside the protected scope get a 401 when
/// they ask for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    subject: SubjectId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl TryFrom<Claims> for AuthContext {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let issued_at =
            DateTime::<Utc>::from_timestamp(claims.iat, 0).ok_or(AuthError::MalformedCredential)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AuthError::MalformedCredential)?;

        Ok(Self {
            subject: claims.user_id,
            issued_at,
            expires_at,
        })
    }
}

impl FromRequest for AuthContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthContext>()
                .cloned()
                .ok_or(AppError::AuthError(AuthError::MissingCredential)),
        )
    }
}
