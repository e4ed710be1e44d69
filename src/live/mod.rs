pub mod generator;
pub mod merge;
pub mod registry;
pub mod scheduler;
pub mod stats;

use std::sync::{Mutex, MutexGuard};

pub use generator::{GeneratorConfig, UpdateGenerator};
pub use merge::{merge_update, LiveTokens};
pub use registry::{Subscription, SubscriptionRegistry};
pub use scheduler::{Scheduler, TimerHandle};
pub use stats::{FeedActivity, FeedSnapshot, TokenStats};

/// Lock a mutex, recovering the data if a subscriber panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
