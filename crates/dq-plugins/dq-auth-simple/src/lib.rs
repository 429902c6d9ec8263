//! # dq-auth-simple
//!
//! HMAC-SHA256 implementation of `IdentityProvider`.
//! Tokens look like `<base64url claims>.<hex signature>` and carry the user
//! id, role and expiry. Issuing them is the login collaborator's job; the
//! engine only ever verifies.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use dq_core::error::{AppError, Result};
use dq_core::models::{Identity, Role};
use dq_core::traits::IdentityProvider;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    /// Expiry as a unix timestamp (seconds)
    exp: i64,
}

pub struct SimpleAuthProvider {
    /// Server secret used to sign and verify tokens
    secret: Vec<u8>,
}

impl SimpleAuthProvider {
    /// Accepts a secret string (e.g., from an environment variable)
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Issues a bearer token for `identity`, valid for `ttl`.
    pub fn issue_token(&self, identity: Identity, ttl: Duration) -> Result<String> {
        let claims = Claims {
            sub: identity.user_id,
            role: identity.role,
            exp: (Utc::now() + ttl).timestamp(),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| AppError::Internal(format!("token encoding: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("token key: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

impl IdentityProvider for SimpleAuthProvider {
    fn verify_token(&self, token: &str) -> Result<Identity> {
        let invalid = || AppError::Unauthorized("invalid token".into());

        let (payload, signature) = token.split_once('.').ok_or_else(invalid)?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;
        // Constant-time comparison.
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| invalid())?;

        let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| invalid())?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::Unauthorized("token expired".into()));
        }

        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
