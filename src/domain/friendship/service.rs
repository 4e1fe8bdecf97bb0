//! Friendship operations with user checks and notifications

use std::sync::Arc;
use tracing::{debug, info};

use super::entity::{FriendRequestOutcome, FriendshipStatus, PendingRequests};
use super::repository::FriendshipRepository;
use crate::domain::shared::{DomainError, Notification, Notifier, Result, UserId};
use crate::domain::user::{User, UserRepository};

pub struct FriendshipService {
    users: Arc<dyn UserRepository>,
    friendships: Arc<dyn FriendshipRepository>,
    notifier: Arc<dyn Notifier>,
}

impl FriendshipService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        friendships: Arc<dyn FriendshipRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            friendships,
            notifier,
        }
    }

    /// Send a friend request; a reciprocal pending request is auto-accepted
    pub async fn request(&self, from: &UserId, to: &UserId) -> Result<FriendRequestOutcome> {
        if from == to {
            return Err(DomainError::ValidationError(
                "cannot send a friend request to yourself".to_string(),
            ));
        }
        self.ensure_user(from).await?;
        self.ensure_user(to).await?;

        let outcome = self.friendships.request(from, to).await?;
        match outcome {
            FriendRequestOutcome::Pending => {
                info!("Friend request {} -> {}", from, to);
                self.notifier.notify(
                    to,
                    Notification::FriendRequest {
                        from_user_id: from.clone(),
                    },
                );
            }
            FriendRequestOutcome::NowFriends => {
                info!("Reciprocal request, {} and {} are now friends", from, to);
                self.notify_accepted(from, to);
            }
        }
        Ok(outcome)
    }

    /// Accept the pending request sent by `requester` to `user`
    pub async fn accept(&self, user: &UserId, requester: &UserId) -> Result<()> {
        self.ensure_user(user).await?;
        self.ensure_user(requester).await?;

        self.friendships.accept(user, requester).await?;
        info!("{} accepted friend request from {}", user, requester);
        self.notify_accepted(user, requester);
        Ok(())
    }

    pub async fn reject(&self, user: &UserId, requester: &UserId) -> Result<()> {
        self.friendships.reject(user, requester).await?;
        info!("{} rejected friend request from {}", user, requester);
        Ok(())
    }

    pub async fn cancel(&self, from: &UserId, to: &UserId) -> Result<()> {
        self.friendships.cancel(from, to).await?;
        info!("{} cancelled friend request to {}", from, to);
        Ok(())
    }

    /// Idempotent unfriend
    pub async fn remove(&self, user: &UserId, other: &UserId) -> Result<()> {
        if self.friendships.remove(user, other).await? {
            info!("{} removed friend {}", user, other);
            self.notifier.notify(
                other,
                Notification::FriendRemoved {
                    peer_id: user.clone(),
                },
            );
        } else {
            debug!("Unfriend {} -> {}: no friendship", user, other);
        }
        Ok(())
    }

    pub async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool> {
        self.friendships.are_friends(a, b).await
    }

    pub async fn list_friends(&self, user: &UserId) -> Result<Vec<User>> {
        self.ensure_user(user).await?;
        let ids = self.friendships.friends_of(user).await?;
        self.users.find_many(&ids).await
    }

    pub async fn list_requests(&self, user: &UserId) -> Result<PendingRequests> {
        self.ensure_user(user).await?;
        Ok(PendingRequests {
            received: self.friendships.pending_received(user).await?,
            sent: self.friendships.pending_sent(user).await?,
        })
    }

    pub async fn status(&self, user: &UserId, other: &UserId) -> Result<FriendshipStatus> {
        self.friendships.status(user, other).await
    }

    async fn ensure_user(&self, id: &UserId) -> Result<()> {
        if self.users.exists(id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(format!("user {}", id)))
        }
    }

    fn notify_accepted(&self, a: &UserId, b: &UserId) {
        self.notifier
            .notify(a, Notification::FriendAccepted { peer_id: b.clone() });
        self.notifier
            .notify(b, Notification::FriendAccepted { peer_id: a.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::User;
    use crate::infrastructure::persistence::MemoryStore;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(UserId, Notification)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, user: &UserId, notification: Notification) {
            self.sent.lock().unwrap().push((user.clone(), notification));
        }
    }

    async fn setup(ids: &[&str]) -> (FriendshipService, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::new());
        for id in ids {
            store
                .insert(User {
                    id: UserId::new(*id),
                    name: id.to_string(),
                    handle: id.to_string(),
                    email: format!("{}@example.com", id),
                    phone: None,
                    password_hash: String::new(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let service = FriendshipService::new(store.clone(), store.clone(), notifier.clone());
        (service, store, notifier)
    }

    #[tokio::test]
    async fn test_request_then_accept() {
        let (service, _, notifier) = setup(&["u1", "u2"]).await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));

        let outcome = service.request(&u1, &u2).await.unwrap();
        assert_eq!(outcome, FriendRequestOutcome::Pending);
        assert_eq!(service.status(&u1, &u2).await.unwrap(), FriendshipStatus::RequestSent);
        assert_eq!(service.status(&u2, &u1).await.unwrap(), FriendshipStatus::RequestReceived);
        assert!(!service.are_friends(&u1, &u2).await.unwrap());

        service.accept(&u2, &u1).await.unwrap();
        assert!(service.are_friends(&u1, &u2).await.unwrap());
        assert!(service.are_friends(&u2, &u1).await.unwrap());

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0].0, u2);
        assert_eq!(sent[0].1.event_type(), "friend_request");
        assert_eq!(sent.len(), 3);
    }

    #[tokio::test]
    async fn test_reciprocal_request_auto_accepts() {
        let (service, _, _) = setup(&["u1", "u2"]).await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));

        service.request(&u1, &u2).await.unwrap();
        let outcome = service.request(&u2, &u1).await.unwrap();
        assert_eq!(outcome, FriendRequestOutcome::NowFriends);

        let requests = service.list_requests(&u1).await.unwrap();
        assert!(requests.sent.is_empty());
        assert!(requests.received.is_empty());
        assert_eq!(service.list_friends(&u1).await.unwrap().len(), 1);
        assert_eq!(service.list_friends(&u2).await.unwrap()[0].id, u1);
    }

    #[tokio::test]
    async fn test_request_errors() {
        let (service, _, _) = setup(&["u1", "u2"]).await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));

        assert!(matches!(
            service.request(&u1, &u1).await,
            Err(DomainError::ValidationError(_))
        ));
        assert!(matches!(
            service.request(&u1, &UserId::new("ghost")).await,
            Err(DomainError::NotFound(_))
        ));

        service.request(&u1, &u2).await.unwrap();
        assert!(matches!(
            service.request(&u1, &u2).await,
            Err(DomainError::Conflict(_))
        ));

        service.accept(&u2, &u1).await.unwrap();
        assert!(matches!(
            service.request(&u2, &u1).await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_without_request_is_not_found() {
        let (service, _, _) = setup(&["u1", "u2"]).await;
        let err = service
            .accept(&UserId::new("u2"), &UserId::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_notifies_once() {
        let (service, _, notifier) = setup(&["u1", "u2"]).await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));

        service.remove(&u1, &u2).await.unwrap();
        service.request(&u1, &u2).await.unwrap();
        service.accept(&u2, &u1).await.unwrap();
        service.remove(&u2, &u1).await.unwrap();
        service.remove(&u2, &u1).await.unwrap();

        assert!(!service.are_friends(&u1, &u2).await.unwrap());
        let removed = notifier
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, n)| n.event_type() == "friend_removed")
            .count();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_reject_and_cancel() {
        let (service, _, _) = setup(&["u1", "u2"]).await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));

        service.request(&u1, &u2).await.unwrap();
        service.reject(&u2, &u1).await.unwrap();
        assert_eq!(service.status(&u1, &u2).await.unwrap(), FriendshipStatus::None);

        service.request(&u1, &u2).await.unwrap();
        service.cancel(&u1, &u2).await.unwrap();
        assert!(matches!(
            service.cancel(&u1, &u2).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
