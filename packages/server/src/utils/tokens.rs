//! Signed session tokens.
//!
//! A login yields three tokens sharing a subject: a long-lived refresh token
//! naming a stored user token, an auth token pointing back at it, and an
//! optional pix token for cached image reads.

use chrono::{DateTime, Duration, Utc};
use common::{Capability, Status, Varint};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::schema::User;

pub fn refresh_token_lifetime() -> Duration {
    Duration::hours(24 * 30 * 6)
}

pub fn auth_token_lifetime() -> Duration {
    Duration::hours(24 * 30)
}

/// Allowance for clocks running slightly behind ours.
fn not_before_skew() -> Duration {
    Duration::minutes(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Refresh,
    Auth,
    Pix,
}

/// Decoded token contents. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPayload {
    /// Varint user id.
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    /// After this the token still works but should be renewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_exp: Option<i64>,
    pub typ: TokenType,
    /// Id of the stored user token (refresh tokens).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<i64>,
    /// Id of the refresh token this token was issued with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpi: Option<i64>,
}

impl TokenPayload {
    pub fn user_id(&self) -> Result<i64, Status> {
        Varint::decode_all(&self.sub)
            .map(|v| v.0)
            .map_err(|e| Status::unauthenticated("can't parse token subject").with_cause(e))
    }
}

/// A signed token with its payload.
#[derive(Debug, Clone)]
pub struct Token {
    pub token: String,
    pub payload: TokenPayload,
}

/// Everything a successful login hands back.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub refresh: Token,
    pub auth: Token,
    pub pix: Option<Token>,
}

/// Signs and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenCoder {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCoder {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn encode(&self, payload: TokenPayload) -> Result<Token, Status> {
        let token = encode(&Header::new(Algorithm::HS512), &payload, &self.encoding)
            .map_err(|e| Status::internal("can't sign token").with_cause(e))?;
        Ok(Token { token, payload })
    }

    /// Verify signature, type and validity window at `now`.
    pub fn decode(
        &self,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<TokenPayload, Status> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        let payload = decode::<TokenPayload>(token, &self.decoding, &validation)
            .map_err(|e| Status::unauthenticated("can't decode token").with_cause(e))?
            .claims;
        if payload.typ != expected {
            return Err(Status::unauthenticated("wrong token type"));
        }
        let now = now.timestamp();
        if now < payload.nbf {
            return Err(Status::unauthenticated("token not yet valid"));
        }
        if now >= payload.exp {
            return Err(Status::unauthenticated("token expired"));
        }
        Ok(payload)
    }

    /// Mint the token triple for `user` after it was granted `token_id`.
    pub fn mint(&self, user: &User, token_id: i64, now: DateTime<Utc>) -> Result<TokenSet, Status> {
        let sub = Varint(user.user_id).encode();
        let nbf = (now - not_before_skew()).timestamp();
        let refresh_exp = (now + refresh_token_lifetime()).timestamp();
        let auth_exp = (now + auth_token_lifetime()).timestamp();

        let refresh = self.encode(TokenPayload {
            sub: sub.clone(),
            nbf,
            exp: refresh_exp,
            soft_exp: None,
            typ: TokenType::Refresh,
            jti: Some(token_id),
            tpi: None,
        })?;
        let auth = self.encode(TokenPayload {
            sub: sub.clone(),
            nbf,
            exp: auth_exp,
            soft_exp: Some(auth_exp),
            typ: TokenType::Auth,
            jti: None,
            tpi: Some(token_id),
        })?;
        let pix = if user.has_capability(Capability::PicRead) {
            Some(self.encode(TokenPayload {
                sub,
                nbf,
                exp: refresh_exp,
                soft_exp: Some(auth_exp),
                typ: TokenType::Pix,
                jti: None,
                tpi: Some(token_id),
            })?)
        } else {
            None
        };
        Ok(TokenSet { refresh, auth, pix })
    }
}
