//! Deterministic routing handles for the media provider

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::domain::shared::UserId;

const HANDLE_SPACE: u64 = 999_999_999;

/// Numeric address of a user inside a media channel
///
/// Derived from the user id alone, so the same user gets the same handle in
/// every session and on every server process. Never zero: providers treat
/// uid 0 as "assign one for me".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingHandle(u32);

impl RoutingHandle {
    pub fn for_user(user: &UserId) -> Self {
        let digest = Sha256::digest(user.as_str().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let n = u64::from_be_bytes(prefix) % HANDLE_SPACE + 1;
        Self(n as u32)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RoutingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
