//! Local HMAC-SHA256 credential signer
//!
//! Token layout: `v1.<app_id>.<base64url(claims json)>.<hex hmac>`, where the
//! HMAC covers everything before the last dot and is keyed with the app
//! certificate shared with the media provider.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::call::{CredentialGrant, CredentialSigner, MediaRole, RoutingHandle, SignerError};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    ch: String,
    uid: RoutingHandle,
    role: MediaRole,
    iat: i64,
    exp: i64,
    salt: u32,
}

pub struct HmacCredentialSigner {
    app_id: String,
    app_certificate: String,
}

impl HmacCredentialSigner {
    pub fn new(app_id: impl Into<String>, app_certificate: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_certificate: app_certificate.into(),
        }
    }

    /// An app id containing `.` would break the token's segment layout
    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.app_id.contains('.') && !self.app_certificate.is_empty()
    }

    fn mac(&self) -> Result<HmacSha256, SignerError> {
        HmacSha256::new_from_slice(self.app_certificate.as_bytes())
            .map_err(|e| SignerError::Rejected(format!("unusable certificate: {}", e)))
    }

    fn sign_now(&self, grant: &CredentialGrant) -> Result<String, SignerError> {
        if !self.is_configured() {
            return Err(SignerError::NotConfigured);
        }
        if grant.expires_at <= grant.issued_at {
            return Err(SignerError::Rejected("grant expires before it is issued".to_string()));
        }

        let claims = Claims {
            ch: grant.channel.clone(),
            uid: grant.uid,
            role: grant.role,
            iat: grant.issued_at.timestamp(),
            exp: grant.expires_at.timestamp(),
            salt: rand::thread_rng().gen(),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| SignerError::Rejected(format!("unencodable grant: {}", e)))?;
        let payload = format!(
            "{}.{}.{}",
            TOKEN_VERSION,
            self.app_id,
            URL_SAFE_NO_PAD.encode(json)
        );

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", payload, signature))
    }

    /// Check a token issued by this signer and recover its grant
    ///
    /// Fails on a foreign app id, a bad signature or an expired grant.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<CredentialGrant, SignerError> {
        if !self.is_configured() {
            return Err(SignerError::NotConfigured);
        }
        let (payload, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| malformed("missing signature"))?;
        let mut parts = payload.splitn(3, '.');
        let (Some(version), Some(app_id), Some(body)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("expected four segments"));
        };
        if version != TOKEN_VERSION {
            return Err(malformed("unknown version"));
        }
        if app_id != self.app_id {
            return Err(SignerError::Rejected("token issued for another app".to_string()));
        }

        let signature = hex::decode(signature).map_err(|_| malformed("signature is not hex"))?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SignerError::Rejected("bad signature".to_string()))?;

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| malformed("claims are not base64url"))?;
        let claims: Claims =
            serde_json::from_slice(&json).map_err(|_| malformed("claims are not json"))?;

        let issued_at = timestamp(claims.iat)?;
        let expires_at = timestamp(claims.exp)?;
        if expires_at <= now {
            return Err(SignerError::Rejected("token expired".to_string()));
        }

        Ok(CredentialGrant {
            channel: claims.ch,
            uid: claims.uid,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }
}

fn malformed(reason: &str) -> SignerError {
    SignerError::Rejected(format!("malformed token: {}", reason))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, SignerError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| malformed("timestamp out of range"))
}

#[async_trait]
impl CredentialSigner for HmacCredentialSigner {
    fn app_id(&self) -> String {
        self.app_id.clone()
    }

    async fn sign(&self, grant: &CredentialGrant) -> Result<String, SignerError> {
        self.sign_now(grant)
    }
}
