//! Call session issuance

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::credential::{CredentialGrant, CredentialSigner, SignerError};
use super::routing::RoutingHandle;
use super::session::{CallSession, CallType, ChannelCredential, MediaRole, PartyCredential};
use crate::domain::friendship::FriendshipRepository;
use crate::domain::shared::{CallId, DomainError, Notification, Notifier, Result, UserId};
use crate::domain::user::UserRepository;

const MAX_CHANNEL_NAME_LEN: usize = 64;

pub struct CallSessionIssuer {
    users: Arc<dyn UserRepository>,
    friendships: Arc<dyn FriendshipRepository>,
    signer: Arc<dyn CredentialSigner>,
    notifier: Arc<dyn Notifier>,
    token_ttl: Duration,
    signer_timeout: std::time::Duration,
}

impl CallSessionIssuer {
    pub fn new(
        users: Arc<dyn UserRepository>,
        friendships: Arc<dyn FriendshipRepository>,
        signer: Arc<dyn CredentialSigner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            friendships,
            signer,
            notifier,
            token_ttl: Duration::seconds(3600),
            signer_timeout: std::time::Duration::from_secs(5),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_signer_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.signer_timeout = timeout;
        self
    }

    /// Start a one-to-one call between two mutual friends
    pub async fn initiate(
        &self,
        caller: &UserId,
        recipient: &UserId,
        call_type: CallType,
    ) -> Result<CallSession> {
        if !self.users.exists(caller).await? {
            return Err(DomainError::NotFound(format!("caller {}", caller)));
        }
        if caller == recipient || !self.friendships.are_friends(caller, recipient).await? {
            warn!("Call {} -> {} refused: not friends", caller, recipient);
            return Err(DomainError::Forbidden(
                "calls are only allowed between friends".to_string(),
            ));
        }

        let call_id = CallId::new();
        let channel_name = CallSession::channel_name_for(&call_id);
        let issued_at = Utc::now();
        let expires_at = issued_at + self.token_ttl;

        let caller_uid = RoutingHandle::for_user(caller);
        let recipient_uid = RoutingHandle::for_user(recipient);

        // Both parties publish and subscribe in a call
        let grant_for = |uid| CredentialGrant {
            channel: channel_name.clone(),
            uid,
            role: MediaRole::Publisher,
            issued_at,
            expires_at,
        };
        let (caller_token, recipient_token) = futures::try_join!(
            self.sign(grant_for(caller_uid)),
            self.sign(grant_for(recipient_uid)),
        )?;

        let session = CallSession {
            call_id,
            channel_name,
            call_type,
            app_id: self.signer.app_id(),
            caller: PartyCredential {
                user_id: caller.clone(),
                uid: caller_uid.value(),
                token: caller_token,
            },
            recipient: PartyCredential {
                user_id: recipient.clone(),
                uid: recipient_uid.value(),
                token: recipient_token,
            },
            issued_at,
            expires_at,
        };

        info!(
            "Issued {} call {} on {} ({} -> {})",
            call_type, session.call_id, session.channel_name, caller, recipient
        );

        self.notifier.notify(
            recipient,
            Notification::IncomingCall {
                call_id: session.call_id,
                caller_id: caller.clone(),
                call_type,
                channel_name: session.channel_name.clone(),
                app_id: session.app_id.clone(),
                token: session.recipient.token.clone(),
                uid: session.recipient.uid,
                expires_at,
            },
        );

        Ok(session)
    }

    /// Credential for a named channel such as a group room
    pub async fn channel_credential(
        &self,
        user: &UserId,
        channel: &str,
        role: MediaRole,
    ) -> Result<ChannelCredential> {
        let channel = channel.trim();
        if channel.is_empty() || channel.len() > MAX_CHANNEL_NAME_LEN {
            return Err(DomainError::ValidationError(format!(
                "channel name must be 1 to {} bytes",
                MAX_CHANNEL_NAME_LEN
            )));
        }
        if !self.users.exists(user).await? {
            return Err(DomainError::NotFound(format!("user {}", user)));
        }

        let uid = RoutingHandle::for_user(user);
        let issued_at = Utc::now();
        let expires_at = issued_at + self.token_ttl;
        let token = self
            .sign(CredentialGrant {
                channel: channel.to_string(),
                uid,
                role,
                issued_at,
                expires_at,
            })
            .await?;

        debug!("Issued {:?} credential on {} for {}", role, channel, user);
        Ok(ChannelCredential {
            app_id: self.signer.app_id(),
            channel_name: channel.to_string(),
            role,
            uid: uid.value(),
            token,
            expires_at,
        })
    }

    async fn sign(&self, grant: CredentialGrant) -> Result<String> {
        match tokio::time::timeout(self.signer_timeout, self.signer.sign(&grant)).await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(e)) => {
                warn!("Credential signer failed for {}: {}", grant.channel, e);
                Err(signer_unavailable(e))
            }
            Err(_) => {
                warn!(
                    "Credential signer timed out after {:?} for {}",
                    self.signer_timeout, grant.channel
                );
                Err(DomainError::Unavailable(
                    "media provider timed out".to_string(),
                ))
            }
        }
    }
}

fn signer_unavailable(e: SignerError) -> DomainError {
    DomainError::Unavailable(e.to_string())
}
