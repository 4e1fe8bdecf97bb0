//! In-memory store backing every repository port
//!
//! All state sits behind one async mutex, so each repository call is a single
//! critical section. Used by tests and when no database is configured.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::domain::friendship::{
    FriendRequest, FriendRequestOutcome, Friendship, FriendshipRepository, FriendshipStatus,
};
use crate::domain::messaging::{DmMessage, DmThread, MessageContent, ThreadRepository};
use crate::domain::shared::{DomainError, MessageId, Result, ThreadId, UserId, UserPair};
use crate::domain::user::{User, UserRepository};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    user_by_email: HashMap<String, UserId>,
    user_by_handle: HashMap<String, UserId>,
    user_by_phone: HashMap<String, UserId>,

    friendships: HashMap<UserPair, Friendship>,
    /// Keyed by (from, to)
    requests: HashMap<(UserId, UserId), FriendRequest>,

    threads: HashMap<ThreadId, DmThread>,
    thread_by_pair: HashMap<UserPair, ThreadId>,
    messages: HashMap<ThreadId, Vec<DmMessage>>,
    read_cursors: HashMap<(ThreadId, UserId), u64>,
}

impl State {
    fn pair(a: &UserId, b: &UserId) -> Result<UserPair> {
        UserPair::new(a.clone(), b.clone())
            .ok_or_else(|| DomainError::ValidationError("users must differ".to_string()))
    }

    fn make_friends(&mut self, pair: UserPair) {
        self.requests
            .remove(&(pair.low().clone(), pair.high().clone()));
        self.requests
            .remove(&(pair.high().clone(), pair.low().clone()));
        self.friendships.entry(pair.clone()).or_insert(Friendship {
            pair,
            created_at: Utc::now(),
        });
    }

    fn cursor(&self, thread_id: &ThreadId, user: &UserId) -> u64 {
        self.read_cursors
            .get(&(*thread_id, user.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Message as observed now, with `read_by` derived from the cursors
    fn view(&self, thread: &DmThread, message: &DmMessage) -> DmMessage {
        let mut message = message.clone();
        message.read_by = [thread.participants.low(), thread.participants.high()]
            .into_iter()
            .filter(|u| self.cursor(&thread.id, u) >= message.seq)
            .cloned()
            .collect();
        message
    }

    fn thread(&self, id: &ThreadId) -> Result<&DmThread> {
        self.threads
            .get(id)
            .ok_or_else(|| DomainError::NotFound(format!("thread {}", id)))
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: User) -> Result<User> {
        let mut state = self.state.lock().await;

        let email = user.email.to_lowercase();
        let handle = user.handle.to_lowercase();
        if state.users.contains_key(&user.id) {
            return Err(DomainError::Conflict(format!("user id {} already exists", user.id)));
        }
        if state.user_by_email.contains_key(&email) {
            return Err(DomainError::Conflict("email already registered".to_string()));
        }
        if state.user_by_handle.contains_key(&handle) {
            return Err(DomainError::Conflict("handle already taken".to_string()));
        }
        if let Some(phone) = &user.phone {
            if state.user_by_phone.contains_key(phone) {
                return Err(DomainError::Conflict("phone already registered".to_string()));
            }
            state.user_by_phone.insert(phone.clone(), user.id.clone());
        }

        state.user_by_email.insert(email, user.id.clone());
        state.user_by_handle.insert(handle, user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .user_by_email
            .get(&email.to_lowercase())
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .user_by_handle
            .get(&handle.to_lowercase())
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn exists(&self, id: &UserId) -> Result<bool> {
        Ok(self.state.lock().await.users.contains_key(id))
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id)).cloned().collect())
    }
}

#[async_trait]
impl FriendshipRepository for MemoryStore {
    async fn request(&self, from: &UserId, to: &UserId) -> Result<FriendRequestOutcome> {
        let pair = State::pair(from, to)?;
        let mut state = self.state.lock().await;

        if state.friendships.contains_key(&pair) {
            return Err(DomainError::Conflict("already friends".to_string()));
        }
        if state.requests.contains_key(&(from.clone(), to.clone())) {
            return Err(DomainError::Conflict("friend request already sent".to_string()));
        }
        if state.requests.contains_key(&(to.clone(), from.clone())) {
            state.make_friends(pair);
            return Ok(FriendRequestOutcome::NowFriends);
        }

        state.requests.insert(
            (from.clone(), to.clone()),
            FriendRequest {
                from_user_id: from.clone(),
                to_user_id: to.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(FriendRequestOutcome::Pending)
    }

    async fn accept(&self, user: &UserId, requester: &UserId) -> Result<()> {
        let pair = State::pair(user, requester)?;
        let mut state = self.state.lock().await;

        if !state
            .requests
            .contains_key(&(requester.clone(), user.clone()))
        {
            return Err(DomainError::NotFound(format!(
                "friend request from {}",
                requester
            )));
        }
        state.make_friends(pair);
        Ok(())
    }

    async fn reject(&self, user: &UserId, requester: &UserId) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .requests
            .remove(&(requester.clone(), user.clone()))
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("friend request from {}", requester)))
    }

    async fn cancel(&self, from: &UserId, to: &UserId) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .requests
            .remove(&(from.clone(), to.clone()))
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("friend request to {}", to)))
    }

    async fn remove(&self, user: &UserId, other: &UserId) -> Result<bool> {
        let Some(pair) = UserPair::new(user.clone(), other.clone()) else {
            return Ok(false);
        };
        Ok(self.state.lock().await.friendships.remove(&pair).is_some())
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool> {
        let Some(pair) = UserPair::new(a.clone(), b.clone()) else {
            return Ok(false);
        };
        Ok(self.state.lock().await.friendships.contains_key(&pair))
    }

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>> {
        let state = self.state.lock().await;
        let mut friends: Vec<UserId> = state
            .friendships
            .keys()
            .filter_map(|pair| pair.other(user).cloned())
            .collect();
        friends.sort();
        Ok(friends)
    }

    async fn pending_received(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        let state = self.state.lock().await;
        let mut requests: Vec<FriendRequest> = state
            .requests
            .values()
            .filter(|r| &r.to_user_id == user)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn pending_sent(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        let state = self.state.lock().await;
        let mut requests: Vec<FriendRequest> = state
            .requests
            .values()
            .filter(|r| &r.from_user_id == user)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn status(&self, user: &UserId, other: &UserId) -> Result<FriendshipStatus> {
        let Some(pair) = UserPair::new(user.clone(), other.clone()) else {
            return Ok(FriendshipStatus::None);
        };
        let state = self.state.lock().await;
        Ok(if state.friendships.contains_key(&pair) {
            FriendshipStatus::Friends
        } else if state.requests.contains_key(&(user.clone(), other.clone())) {
            FriendshipStatus::RequestSent
        } else if state.requests.contains_key(&(other.clone(), user.clone())) {
            FriendshipStatus::RequestReceived
        } else {
            FriendshipStatus::None
        })
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn get_or_create_thread(&self, pair: &UserPair) -> Result<(DmThread, bool)> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.thread_by_pair.get(pair) {
            return Ok((state.thread(id)?.clone(), false));
        }

        let thread = DmThread::new(pair.clone());
        state.thread_by_pair.insert(pair.clone(), thread.id);
        state.threads.insert(thread.id, thread.clone());
        Ok((thread, true))
    }

    async fn find_thread(&self, id: &ThreadId) -> Result<Option<DmThread>> {
        Ok(self.state.lock().await.threads.get(id).cloned())
    }

    async fn threads_for_user(
        &self,
        user: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DmThread>> {
        let state = self.state.lock().await;
        let mut threads: Vec<&DmThread> = state
            .threads
            .values()
            .filter(|t| t.is_participant(user))
            .collect();
        threads.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(threads
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn append_message(
        &self,
        thread_id: &ThreadId,
        sender: &UserId,
        content: MessageContent,
    ) -> Result<DmMessage> {
        let mut state = self.state.lock().await;
        let thread = state.thread(thread_id)?;
        if !thread.is_participant(sender) {
            return Err(DomainError::Forbidden(
                "not a participant of this thread".to_string(),
            ));
        }

        let seq = thread.last_seq + 1;
        let sent_at = match thread.last_message_at {
            Some(previous) => Utc::now().max(previous),
            None => Utc::now(),
        };
        let message = DmMessage {
            id: MessageId::new(),
            thread_id: *thread_id,
            seq,
            sender_id: sender.clone(),
            content,
            sent_at,
            read_by: Vec::new(),
        };

        if let Some(thread) = state.threads.get_mut(thread_id) {
            thread.last_seq = seq;
            thread.last_message_at = Some(sent_at);
        }
        state
            .messages
            .entry(*thread_id)
            .or_default()
            .push(message.clone());
        let cursor = state
            .read_cursors
            .entry((*thread_id, sender.clone()))
            .or_insert(0);
        *cursor = (*cursor).max(seq);

        let thread = state.thread(thread_id)?;
        Ok(state.view(thread, &message))
    }

    async fn messages_after(
        &self,
        thread_id: &ThreadId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<DmMessage>> {
        let state = self.state.lock().await;
        let thread = state.thread(thread_id)?;
        let Some(messages) = state.messages.get(thread_id) else {
            return Ok(Vec::new());
        };
        // seq == index + 1
        let start = (after_seq as usize).min(messages.len());
        Ok(messages[start..]
            .iter()
            .take(limit)
            .map(|m| state.view(thread, m))
            .collect())
    }

    async fn mark_read(
        &self,
        thread_id: &ThreadId,
        user: &UserId,
        message_id: &MessageId,
    ) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.thread(thread_id)?;
        let seq = state
            .messages
            .get(thread_id)
            .and_then(|messages| messages.iter().find(|m| &m.id == message_id))
            .map(|m| m.seq)
            .ok_or_else(|| DomainError::NotFound(format!("message {}", message_id)))?;

        let cursor = state
            .read_cursors
            .entry((*thread_id, user.clone()))
            .or_insert(0);
        *cursor = (*cursor).max(seq);
        Ok(*cursor)
    }

    async fn unread_count(&self, thread_id: &ThreadId, user: &UserId) -> Result<u64> {
        let state = self.state.lock().await;
        let cursor = state.cursor(thread_id, user);
        Ok(state
            .messages
            .get(thread_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.seq > cursor && &m.sender_id != user)
                    .count() as u64
            })
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(id: &str) -> User {
        User {
            id: UserId::new(id),
            name: id.to_string(),
            handle: id.to_string(),
            email: format!("{}@example.com", id),
            phone: None,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unique_user_fields() {
        let store = MemoryStore::new();
        store.insert(user("alice")).await.unwrap();

        let mut dup_email = user("bob");
        dup_email.email = "ALICE@example.com".to_string();
        assert!(matches!(
            store.insert(dup_email).await,
            Err(DomainError::Conflict(_))
        ));

        let mut dup_handle = user("carol");
        dup_handle.handle = "Alice".to_string();
        assert!(matches!(
            store.insert(dup_handle).await,
            Err(DomainError::Conflict(_))
        ));

        let mut with_phone = user("dave");
        with_phone.phone = Some("+15550100".to_string());
        store.insert(with_phone).await.unwrap();
        let mut dup_phone = user("erin");
        dup_phone.phone = Some("+15550100".to_string());
        assert!(matches!(
            store.insert(dup_phone).await,
            Err(DomainError::Conflict(_))
        ));

        assert!(store.find_by_handle("ALICE").await.unwrap().is_some());
        assert!(store.find_by_id(&UserId::new("erin")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_reciprocal_requests_make_one_friendship() {
        for _ in 0..50 {
            let store = Arc::new(MemoryStore::new());
            let (a, b) = (UserId::new("a"), UserId::new("b"));

            let s1 = store.clone();
            let (a1, b1) = (a.clone(), b.clone());
            let t1 = tokio::spawn(async move { s1.request(&a1, &b1).await });
            let s2 = store.clone();
            let (a2, b2) = (a.clone(), b.clone());
            let t2 = tokio::spawn(async move { s2.request(&b2, &a2).await });

            let mut outcomes = vec![t1.await.unwrap().unwrap(), t2.await.unwrap().unwrap()];
            outcomes.sort_by_key(|o| o.as_str());
            assert_eq!(
                outcomes,
                [FriendRequestOutcome::NowFriends, FriendRequestOutcome::Pending]
            );
            assert!(store.are_friends(&a, &b).await.unwrap());
            assert!(store.pending_sent(&a).await.unwrap().is_empty());
            assert!(store.pending_sent(&b).await.unwrap().is_empty());
            assert_eq!(store.friends_of(&a).await.unwrap(), vec![b.clone()]);
            assert_eq!(store.friends_of(&b).await.unwrap(), vec![a.clone()]);
        }
    }

    #[tokio::test]
    async fn test_symmetry_after_interleaving() {
        let store = Arc::new(MemoryStore::new());
        let ids: Vec<UserId> = (0..6).map(|i| UserId::new(format!("u{}", i))).collect();

        let mut tasks = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                let store = store.clone();
                let (a, b) = (a.clone(), b.clone());
                tasks.push(tokio::spawn(async move {
                    let _ = store.request(&a, &b).await;
                    let _ = store.request(&b, &a).await;
                    if a.as_str() < "u2" {
                        let _ = store.remove(&b, &a).await;
                    }
                }));
            }
        }
        for task in tasks {
            task.await.unwrap();
        }

        for a in &ids {
            for b in store.friends_of(a).await.unwrap() {
                assert!(store.friends_of(&b).await.unwrap().contains(a));
                assert!(store.are_friends(&b, a).await.unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_thread() {
        let store = Arc::new(MemoryStore::new());
        let pair = UserPair::new("u1".into(), "u2".into()).unwrap();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let pair = pair.clone();
            tasks.push(tokio::spawn(
                async move { store.get_or_create_thread(&pair).await },
            ));
        }

        let mut ids = HashSet::new();
        let mut created = 0;
        for task in tasks {
            let (thread, was_created) = task.await.unwrap().unwrap();
            ids.insert(thread.id);
            created += was_created as usize;
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_distinct_seqs() {
        let store = Arc::new(MemoryStore::new());
        let pair = UserPair::new("u1".into(), "u2".into()).unwrap();
        let (thread, _) = store.get_or_create_thread(&pair).await.unwrap();
        let thread_id = thread.id;

        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let sender = if i % 2 == 0 { "u1" } else { "u2" };
            tasks.push(tokio::spawn(async move {
                store
                    .append_message(&thread_id, &UserId::new(sender), MessageContent::text("x"))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let messages = store.messages_after(&thread.id, 0, 100).await.unwrap();
        let seqs: Vec<u64> = messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, (1..=20).collect::<Vec<_>>());
        assert!(messages.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
        assert_eq!(store.find_thread(&thread.id).await.unwrap().unwrap().last_seq, 20);
    }

    #[tokio::test]
    async fn test_inbox_pages_with_equal_activity() {
        let store = MemoryStore::new();
        let created_at = Utc::now();
        {
            let mut state = store.state.lock().await;
            for peer in ["u2", "u3", "u4", "u5", "u6"] {
                let pair = UserPair::new("u1".into(), peer.into()).unwrap();
                let mut thread = DmThread::new(pair.clone());
                thread.created_at = created_at;
                state.thread_by_pair.insert(pair, thread.id);
                state.threads.insert(thread.id, thread);
            }
        }

        let user = UserId::new("u1");
        let mut paged = Vec::new();
        for offset in 0..5 {
            let page = store.threads_for_user(&user, offset, 1).await.unwrap();
            paged.extend(page.into_iter().map(|t| t.id));
        }
        let all: Vec<ThreadId> = store
            .threads_for_user(&user, 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(paged, all);
        assert_eq!(paged.iter().collect::<HashSet<_>>().len(), 5);
    }

    #[tokio::test]
    async fn test_append_to_unknown_thread() {
        let store = MemoryStore::new();
        let err = store
            .append_message(&ThreadId::new(), &UserId::new("u1"), MessageContent::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
