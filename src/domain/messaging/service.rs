//! Direct messaging between two users

use std::sync::Arc;
use tracing::{debug, info};

use super::entity::{DmMessage, DmThread, MessageContent, MessagePage, PageRequest, ThreadSummary};
use super::repository::ThreadRepository;
use crate::domain::shared::{
    DomainError, MessageId, Notification, Notifier, Result, ThreadId, UserId, UserPair,
};
use crate::domain::user::UserRepository;

pub struct MessagingService {
    users: Arc<dyn UserRepository>,
    threads: Arc<dyn ThreadRepository>,
    notifier: Arc<dyn Notifier>,
}

impl MessagingService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        threads: Arc<dyn ThreadRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            threads,
            notifier,
        }
    }

    /// The unique thread between `a` and `b`, created on first use
    pub async fn get_or_create_thread(&self, a: &UserId, b: &UserId) -> Result<DmThread> {
        let pair = UserPair::new(a.clone(), b.clone()).ok_or_else(|| {
            DomainError::ValidationError("cannot open a thread with yourself".to_string())
        })?;
        for user in [a, b] {
            if !self.users.exists(user).await? {
                return Err(DomainError::NotFound(format!("user {}", user)));
            }
        }

        let (thread, created) = self.threads.get_or_create_thread(&pair).await?;
        if created {
            info!("Opened thread {} between {} and {}", thread.id, pair.low(), pair.high());
        }
        Ok(thread)
    }

    pub async fn append_message(
        &self,
        thread_id: &ThreadId,
        sender: &UserId,
        content: MessageContent,
    ) -> Result<DmMessage> {
        let thread = self.thread_for(thread_id, sender).await.map_err(|e| match e {
            // Outsiders cannot learn whether the thread exists
            DomainError::Forbidden(_) => DomainError::NotFound(format!("thread {}", thread_id)),
            other => other,
        })?;
        let content = content.validated()?;

        let message = self
            .threads
            .append_message(thread_id, sender, content)
            .await?;
        debug!("Message {} seq {} in thread {}", message.id, message.seq, thread_id);

        if let Some(peer) = thread.participants.other(sender) {
            self.notifier.notify(
                peer,
                Notification::NewMessage {
                    thread_id: *thread_id,
                    message_id: message.id,
                    sender_id: sender.clone(),
                    seq: message.seq,
                    text: message.content.text.clone(),
                    media_url: message.content.media_url.clone(),
                    sent_at: message.sent_at,
                },
            );
        }
        Ok(message)
    }

    /// One page of the log, oldest first
    pub async fn list_messages(
        &self,
        thread_id: &ThreadId,
        requester: &UserId,
        page: &PageRequest,
    ) -> Result<MessagePage> {
        self.thread_for(thread_id, requester).await?;
        let after_seq = page.after_seq()?;
        let limit = page.limit();

        let items = self
            .threads
            .messages_after(thread_id, after_seq, limit)
            .await?;
        let next_cursor = if items.len() == limit {
            items.last().map(|m| m.seq.to_string())
        } else {
            None
        };
        Ok(MessagePage { items, next_cursor })
    }

    pub async fn list_threads(
        &self,
        user: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ThreadSummary>> {
        let limit = limit.clamp(1, super::entity::MAX_PAGE_LIMIT);
        let threads = self.threads.threads_for_user(user, offset, limit).await?;

        let mut summaries = Vec::with_capacity(threads.len());
        for thread in threads {
            let Some(peer) = thread.participants.other(user).cloned() else {
                continue;
            };
            let unread = self.threads.unread_count(&thread.id, user).await?;
            summaries.push(ThreadSummary {
                id: thread.id,
                peer_user_id: peer,
                created_at: thread.created_at,
                last_message_at: thread.last_message_at,
                last_seq: thread.last_seq,
                unread,
            });
        }
        Ok(summaries)
    }

    /// Advance the reader's cursor and tell the peer
    pub async fn mark_read(
        &self,
        thread_id: &ThreadId,
        reader: &UserId,
        message_id: &MessageId,
    ) -> Result<u64> {
        let thread = self.thread_for(thread_id, reader).await?;
        let up_to_seq = self.threads.mark_read(thread_id, reader, message_id).await?;

        if let Some(peer) = thread.participants.other(reader) {
            self.notifier.notify(
                peer,
                Notification::MessagesRead {
                    thread_id: *thread_id,
                    reader_id: reader.clone(),
                    up_to_seq,
                },
            );
        }
        Ok(up_to_seq)
    }

    async fn thread_for(&self, thread_id: &ThreadId, user: &UserId) -> Result<DmThread> {
        let thread = self
            .threads
            .find_thread(thread_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("thread {}", thread_id)))?;
        if !thread.is_participant(user) {
            return Err(DomainError::Forbidden(
                "not a participant of this thread".to_string(),
            ));
        }
        Ok(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::NoopNotifier;
    use crate::domain::user::User;
    use crate::infrastructure::persistence::MemoryStore;
    use chrono::Utc;

    async fn setup() -> MessagingService {
        let store = Arc::new(MemoryStore::new());
        for id in ["u1", "u2", "u3"] {
            store
                .insert(User {
                    id: UserId::new(id),
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
        MessagingService::new(store.clone(), store, Arc::new(NoopNotifier))
    }

    #[tokio::test]
    async fn test_thread_is_unique_per_pair() {
        let service = setup().await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));

        let a = service.get_or_create_thread(&u1, &u2).await.unwrap();
        let b = service.get_or_create_thread(&u2, &u1).await.unwrap();
        assert_eq!(a.id, b.id);

        assert!(matches!(
            service.get_or_create_thread(&u1, &u1).await,
            Err(DomainError::ValidationError(_))
        ));
        assert!(matches!(
            service.get_or_create_thread(&u1, &UserId::new("ghost")).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_messages_are_listed_in_append_order() {
        let service = setup().await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let thread = service.get_or_create_thread(&u1, &u2).await.unwrap();

        for (sender, text) in [(&u1, "one"), (&u2, "two"), (&u1, "three")] {
            service
                .append_message(&thread.id, sender, MessageContent::text(text))
                .await
                .unwrap();
        }

        let page = service
            .list_messages(&thread.id, &u2, &PageRequest::default())
            .await
            .unwrap();
        let texts: Vec<_> = page
            .items
            .iter()
            .map(|m| m.content.text.as_deref().unwrap())
            .collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert_eq!(
            page.items.iter().map(|m| m.seq).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert!(page.next_cursor.is_none());
        assert!(page.items.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
    }

    #[tokio::test]
    async fn test_cursor_pagination() {
        let service = setup().await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let thread = service.get_or_create_thread(&u1, &u2).await.unwrap();
        for i in 0..5 {
            service
                .append_message(&thread.id, &u1, MessageContent::text(format!("m{}", i)))
                .await
                .unwrap();
        }

        let mut page = PageRequest {
            cursor: None,
            limit: Some(2),
        };
        let mut seen = Vec::new();
        loop {
            let result = service.list_messages(&thread.id, &u1, &page).await.unwrap();
            seen.extend(result.items.iter().map(|m| m.seq));
            match result.next_cursor {
                Some(cursor) => page.cursor = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen, [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_outsider_access() {
        let service = setup().await;
        let (u1, u2, u3) = (UserId::new("u1"), UserId::new("u2"), UserId::new("u3"));
        let thread = service.get_or_create_thread(&u1, &u2).await.unwrap();

        assert!(matches!(
            service
                .list_messages(&thread.id, &u3, &PageRequest::default())
                .await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service
                .append_message(&thread.id, &u3, MessageContent::text("hi"))
                .await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            service
                .append_message(&ThreadId::new(), &u1, MessageContent::text("hi"))
                .await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let service = setup().await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let thread = service.get_or_create_thread(&u1, &u2).await.unwrap();

        let err = service
            .append_message(&thread.id, &u1, MessageContent::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));

        let page = service
            .list_messages(&thread.id, &u1, &PageRequest::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_read_cursor_and_unread_counts() {
        let service = setup().await;
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let thread = service.get_or_create_thread(&u1, &u2).await.unwrap();

        let first = service
            .append_message(&thread.id, &u1, MessageContent::text("a"))
            .await
            .unwrap();
        assert_eq!(first.read_by, vec![u1.clone()]);
        let second = service
            .append_message(&thread.id, &u1, MessageContent::text("b"))
            .await
            .unwrap();

        let inbox = service.list_threads(&u2, 0, 20).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].peer_user_id, u1);
        assert_eq!(inbox[0].unread, 2);

        assert_eq!(service.mark_read(&thread.id, &u2, &second.id).await.unwrap(), 2);
        // Cursor never moves backwards
        assert_eq!(service.mark_read(&thread.id, &u2, &first.id).await.unwrap(), 2);
        assert_eq!(service.list_threads(&u2, 0, 20).await.unwrap()[0].unread, 0);

        let page = service
            .list_messages(&thread.id, &u1, &PageRequest::default())
            .await
            .unwrap();
        assert!(page.items.iter().all(|m| m.read_by.contains(&u2)));

        assert!(matches!(
            service.mark_read(&thread.id, &u2, &MessageId::new()).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
