use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error};

use super::claims::Claims;
use crate::{
    config::JwtConfig,
    error::{AppError, Result},
    state::AppState,
};

/// Signs and validates bearer tokens. Built once from config, read-only afterwards.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    default_ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            default_ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64).saturating_mul(60)),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String> {
        self.issue_at(subject, OffsetDateTime::now_utc(), ttl)
    }

    pub fn issue_default(&self, subject: &str) -> Result<String> {
        self.issue(subject, self.default_ttl)
    }

    fn issue_at(&self, subject: &str, now: OffsetDateTime, ttl: Duration) -> Result<String> {
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token ttl out of range")))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt encode failed");
            AppError::Internal(e.into())
        })?;
        debug!(subject, "jwt signed");
        Ok(token)
    }

    /// Returns the subject of a valid token.
    pub fn validate(&self, token: &str) -> Result<String> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                ErrorKind::InvalidSignature => AppError::BadSignature,
                // The header is decoded before the HMAC check, so a damaged
                // header never reaches it.
                _ if is_jwt_shaped(token) && header_is_damaged(token) => AppError::BadSignature,
                _ => AppError::MalformedToken,
            }
        })?;
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}

/// Three non-empty dot-separated segments.
fn is_jwt_shaped(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

fn header_is_damaged(token: &str) -> bool {
    match decode_header(token) {
        Ok(header) => header.alg != Algorithm::HS256,
        Err(_) => true,
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.auth.keys().clone()
    }
}

#[cfg(test)]
pub(crate) fn test_keys(secret: &str) -> JwtKeys {
    JwtKeys::new(&JwtConfig {
        secret: secret.into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_minutes: 30,
    })
}
