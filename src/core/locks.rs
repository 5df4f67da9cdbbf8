//! Per-user serialization of mutations.
//!
//! Every write that ends in a balance rebuild holds its user's lock from before the
//! transaction starts until it commits, so two requests for the same user can never
//! interleave their reads and writes. Different users never contend.
//!
//! A registry entry only lives while someone holds or waits for it; releasing the last
//! guard removes it.

use dashmap::DashMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

static USER_LOCKS: LazyLock<DashMap<i64, Arc<AsyncMutex<()>>>> = LazyLock::new(DashMap::new);

/// Exclusive access to one user's records, released on drop.
#[derive(Debug)]
pub struct UserLock {
    user_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLock {
    fn drop(&mut self) {
        // Release first so the guard's handle no longer counts as a holder.
        drop(self.guard.take());
        USER_LOCKS.remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Waits for exclusive access to `user_id`'s records.
///
/// The lock is released when the returned guard is dropped. It is not reentrant.
pub async fn lock_user(user_id: i64) -> UserLock {
    // The shard lock is released before awaiting.
    let lock = Arc::clone(USER_LOCKS.entry(user_id).or_default().value());
    UserLock {
        user_id,
        guard: Some(lock.lock_owned().await),
    }
}
