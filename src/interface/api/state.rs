//! Shared handler state

use std::sync::Arc;

use crate::config::Config;
use crate::domain::call::{CallSessionIssuer, CredentialSigner};
use crate::domain::friendship::{FriendshipRepository, FriendshipService};
use crate::domain::messaging::{MessagingService, ThreadRepository};
use crate::domain::shared::Notifier;
use crate::domain::user::{UserRepository, UserService};
use crate::infrastructure::persistence::MemoryStore;
use crate::infrastructure::realtime::SessionRegistry;

/// Storage ports the services are built on
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub friendships: Arc<dyn FriendshipRepository>,
    pub threads: Arc<dyn ThreadRepository>,
}

impl Repositories {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            friendships: store.clone(),
            threads: store,
        }
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub friendships: Arc<FriendshipService>,
    pub calls: Arc<CallSessionIssuer>,
    pub messaging: Arc<MessagingService>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(repos: Repositories, signer: Arc<dyn CredentialSigner>, config: &Config) -> Self {
        let sessions = SessionRegistry::new();
        let notifier: Arc<dyn Notifier> = Arc::new(sessions.clone());

        let calls = CallSessionIssuer::new(
            repos.users.clone(),
            repos.friendships.clone(),
            signer,
            notifier.clone(),
        )
        .with_token_ttl(config.media.token_ttl())
        .with_signer_timeout(config.media.signer_timeout());

        Self {
            users: Arc::new(UserService::new(repos.users.clone(), config.auth.bcrypt_cost)),
            friendships: Arc::new(FriendshipService::new(
                repos.users.clone(),
                repos.friendships,
                notifier.clone(),
            )),
            calls: Arc::new(calls),
            messaging: Arc::new(MessagingService::new(repos.users, repos.threads, notifier)),
            sessions,
        }
    }
}
