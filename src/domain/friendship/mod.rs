//! Friend graph: symmetric friendships and directed pending requests

pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{
    FriendRequest, FriendRequestOutcome, Friendship, FriendshipStatus, PendingRequests,
};
pub use repository::FriendshipRepository;
pub use service::FriendshipService;
