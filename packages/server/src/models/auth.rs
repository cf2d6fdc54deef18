use serde::{Deserialize, Serialize};

use crate::utils::tokens::{TokenPayload, TokenSet};

/// Request body for `GetRefreshToken`.
///
/// Either `ident` and `secret`, or a refresh token. The refresh token may
/// also come from its cookie.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct GetRefreshTokenRequest {
    #[schema(example = "alice@example.com")]
    pub ident: Option<String>,
    pub secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GetRefreshTokenResponse {
    pub refresh_token: String,
    pub auth_token: String,
    pub pix_token: Option<String>,
    pub refresh_payload: TokenPayload,
    pub auth_payload: TokenPayload,
    pub pix_payload: Option<TokenPayload>,
}

impl From<TokenSet> for GetRefreshTokenResponse {
    fn from(set: TokenSet) -> Self {
        let (pix_token, pix_payload) = match set.pix {
            Some(t) => (Some(t.token), Some(t.payload)),
            None => (None, None),
        };
        Self {
            refresh_token: set.refresh.token,
            auth_token: set.auth.token,
            pix_token,
            refresh_payload: set.refresh.payload,
            auth_payload: set.auth.payload,
            pix_payload,
        }
    }
}
