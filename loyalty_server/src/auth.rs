//! Cookie-based request authentication.
//!
//! Register and login hand the client a signed JWT in the [`AUTH_COOKIE`] cookie. Every protected
//! handler takes a [`JwtClaims`] argument; the `FromRequest` impl below resolves it from the
//! cookie, so an invalid or missing token never reaches handler code.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::Duration;
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt, Claims, Header, TimeOptions, Token, UntrustedToken,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::{AuthError, ServerError}};

pub const AUTH_COOKIE: &str = "lpg_access_token";

const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

/// The payload of an access token. The core treats the login as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub login: String,
}

/// Issues and validates access tokens. HMAC is symmetric, so one object does both jobs.
pub struct TokenIssuer {
    key: Hs256Key,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: Hs256Key::new(config.jwt_secret.reveal().as_slice()) }
    }

    pub fn issue_token(&self, login: &str, lifetime: Option<Duration>) -> Result<String, AuthError> {
        let header = Header::empty().with_token_type("JWT");
        let lifetime = lifetime.unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));
        let claims = Claims::new(JwtClaims { login: login.to_string() })
            .set_duration_and_issuance(&TimeOptions::default(), lifetime);
        let token =
            Hs256.token(&header, &claims, &self.key).map_err(|e| AuthError::TokenCreation(format!("{e:?}")))?;
        Ok(token)
    }

    pub fn validate_token<S: AsRef<str>>(&self, token: S) -> Result<JwtClaims, AuthError> {
        let untrusted = UntrustedToken::new(token.as_ref())
            .map_err(|e| AuthError::PoorlyFormattedToken(format!("{e:?}")))?;
        let token: Token<JwtClaims> = Hs256
            .validator(&self.key)
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(format!("{e}")))?;
        token
            .claims()
            .validate_expiration(&TimeOptions::default())
            .map_err(|e| AuthError::ValidationError(format!("{e}")))?;
        Ok(token.claims().custom.clone())
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_cookie(req))
    }
}

fn claims_from_cookie(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("The token issuer is not configured".to_string()))?;
    let cookie = req
        .cookie(AUTH_COOKIE)
        .ok_or_else(|| ServerError::Unauthenticated("no auth cookie in the request".to_string()))?;
    issuer.validate_token(cookie.value()).map_err(|e| {
        debug!("🔑️ Rejected access token. {e}");
        ServerError::Unauthenticated(e.to_string())
    })
}

#[cfg(test)]
mod test {
    use lpg_common::Secret;

    use super::*;

    fn issuer() -> TokenIssuer {
        let config =
            AuthConfig { jwt_secret: Secret::new(b"test-signing-secret".to_vec()), ephemeral: false };
        TokenIssuer::new(&config)
    }

    #[test]
    fn tokens_round_trip() {
        let token = issuer().issue_token("alice", None).unwrap();
        let claims = issuer().validate_token(&token).unwrap();
        assert_eq!(claims.login, "alice");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = issuer().issue_token("alice", Some(Duration::hours(-1))).unwrap();
        let result = issuer().validate_token(&token);
        assert!(matches!(result, Err(AuthError::ValidationError(_))));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let mut token = issuer().issue_token("alice", None).unwrap();
        token.replace_range(token.len() - 6..token.len() - 1, "AAAAA");
        assert!(issuer().validate_token(&token).is_err());
    }

    #[test]
    fn tokens_from_a_different_key_are_rejected() {
        let other = TokenIssuer::new(&AuthConfig {
            jwt_secret: Secret::new(b"some-other-secret".to_vec()),
            ephemeral: false,
        });
        let token = other.issue_token("alice", None).unwrap();
        assert!(matches!(issuer().validate_token(&token), Err(AuthError::ValidationError(_))));
    }
}
