//! Subscription Registry
//!
//! Fans simulated updates out to per-token subscribers and owns the lifetime
//! of every token's generator: the first subscriber to a name starts its
//! timer, the last one to leave cancels it.
//!
//! Subscriber callbacks always run outside the registry lock, so a callback
//! may subscribe or unsubscribe (itself included) without deadlocking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PulseError, PulseResult};
use crate::live::generator::{GeneratorConfig, UpdateGenerator};
use crate::live::lock;
use crate::live::scheduler::{Scheduler, TimerHandle};
use crate::live::stats::{FeedActivity, FeedSnapshot};
use crate::models::UpdateEvent;

pub type UpdateCallback = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Disposed,
}

struct Registration {
    id: Uuid,
    callback: UpdateCallback,
    active: Arc<AtomicBool>,
}

/// Everything live for one token name.
struct TokenFeed {
    registrations: Vec<Registration>,
    generator: Arc<Mutex<UpdateGenerator>>,
    /// `None` until the registry is started
    timer: Option<TimerHandle>,
}

struct RegistryInner {
    lifecycle: Lifecycle,
    scheduler: Option<Scheduler>,
    feeds: HashMap<String, TokenFeed>,
    /// Generators kept after their last subscriber left
    parked: HashMap<String, Arc<Mutex<UpdateGenerator>>>,
    /// Parked names, oldest first
    parked_order: VecDeque<String>,
    retain_state: bool,
    max_parked: usize,
    seeds: StdRng,
}

impl RegistryInner {
    fn park(&mut self, token_name: &str, generator: Arc<Mutex<UpdateGenerator>>) {
        self.parked.insert(token_name.to_string(), generator);
        self.parked_order.retain(|name| name != token_name);
        self.parked_order.push_back(token_name.to_string());

        while self.parked.len() > self.max_parked {
            let Some(oldest) = self.parked_order.pop_front() else {
                break;
            };
            self.parked.remove(&oldest);
            debug!("Dropped parked generator for {}", oldest);
        }
    }

    fn unpark(&mut self, token_name: &str) -> Option<Arc<Mutex<UpdateGenerator>>> {
        let generator = self.parked.remove(token_name)?;
        self.parked_order.retain(|name| name != token_name);
        Some(generator)
    }
}

/// Keyed fan-out of simulated token updates. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    config: Arc<GeneratorConfig>,
    activity: Arc<FeedActivity>,
}

impl SubscriptionRegistry {
    pub fn new(config: GeneratorConfig) -> Self {
        let seeds = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                lifecycle: Lifecycle::Idle,
                scheduler: None,
                feeds: HashMap::new(),
                parked: HashMap::new(),
                parked_order: VecDeque::new(),
                retain_state: config.retain_state_on_stop,
                max_parked: config.max_parked,
                seeds,
            })),
            config: Arc::new(config),
            activity: Arc::new(FeedActivity::new()),
        }
    }

    /// Start generating on the current tokio runtime.
    pub fn start(&self) -> PulseResult<()> {
        self.start_with(Scheduler::from_current()?)
    }

    /// Start generating on the given scheduler. Tokens subscribed before the
    /// start begin ticking now.
    pub fn start_with(&self, scheduler: Scheduler) -> PulseResult<()> {
        let mut inner = lock(&self.inner);
        match inner.lifecycle {
            Lifecycle::Running => return Err(PulseError::AlreadyStarted),
            Lifecycle::Disposed => return Err(PulseError::Disposed),
            Lifecycle::Idle => {}
        }

        info!("📡 Starting live update service ({} tokens pending)", inner.feeds.len());
        inner.lifecycle = Lifecycle::Running;
        inner.scheduler = Some(scheduler.clone());

        for (name, feed) in inner.feeds.iter_mut() {
            feed.timer = Some(self.spawn_timer(&scheduler, name, feed.generator.clone()));
        }
        Ok(())
    }

    /// Cancel every timer and drop every registration. The registry cannot be restarted.
    pub fn dispose(&self) {
        let mut inner = lock(&self.inner);
        if inner.lifecycle == Lifecycle::Disposed {
            return;
        }

        let feeds = std::mem::take(&mut inner.feeds);
        for (_, feed) in feeds.iter() {
            for registration in &feed.registrations {
                registration.active.store(false, Ordering::SeqCst);
            }
        }
        inner.parked.clear();
        inner.parked_order.clear();
        inner.scheduler = None;
        inner.lifecycle = Lifecycle::Disposed;
        drop(inner);

        info!("🛑 Live update service disposed ({} feeds stopped)", feeds.len());
        // Timer handles cancel on drop.
        drop(feeds);
    }

    /// Register `callback` for updates to `token_name`.
    ///
    /// Every call creates an independent registration, even for the same
    /// callback. Dropping or unsubscribing the returned handle removes it.
    pub fn subscribe<F>(&self, token_name: &str, callback: F) -> Subscription
    where
        F: Fn(&UpdateEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let active = Arc::new(AtomicBool::new(false));
        let subscription = Subscription {
            id,
            token_name: token_name.to_string(),
            active: active.clone(),
            registry: Arc::downgrade(&self.inner),
        };

        let mut inner = lock(&self.inner);
        if inner.lifecycle == Lifecycle::Disposed {
            warn!("Ignoring subscription to {} on a disposed update service", token_name);
            return subscription;
        }

        active.store(true, Ordering::SeqCst);
        let registration = Registration {
            id,
            callback: Arc::new(callback),
            active,
        };

        if let Some(feed) = inner.feeds.get_mut(token_name) {
            feed.registrations.push(registration);
            debug!("New subscriber for {} ({} total)", token_name, feed.registrations.len());
            return subscription;
        }

        // First subscriber: bring up the generator.
        let generator = match inner.unpark(token_name) {
            Some(generator) => {
                debug!("Resuming parked generator for {}", token_name);
                generator
            }
            None => {
                let seed = inner.seeds.gen::<u64>();
                Arc::new(Mutex::new(UpdateGenerator::new(token_name, seed, (*self.config).clone())))
            }
        };

        let timer = inner.scheduler.as_ref().map(|scheduler| {
            info!("▶️ Started live updates for {}", token_name);
            self.spawn_timer(scheduler, token_name, generator.clone())
        });

        inner.feeds.insert(
            token_name.to_string(),
            TokenFeed {
                registrations: vec![registration],
                generator,
                timer,
            },
        );

        subscription
    }

    /// Number of live registrations for a token.
    pub fn subscriber_count(&self, token_name: &str) -> usize {
        lock(&self.inner)
            .feeds
            .get(token_name)
            .map(|feed| feed.registrations.len())
            .unwrap_or(0)
    }

    /// Whether a timer is currently running for a token.
    pub fn is_generating(&self, token_name: &str) -> bool {
        lock(&self.inner)
            .feeds
            .get(token_name)
            .and_then(|feed| feed.timer.as_ref())
            .map(|timer| timer.is_active())
            .unwrap_or(false)
    }

    /// Names whose stopped generators are kept for a resubscribe, oldest first.
    pub fn parked_tokens(&self) -> Vec<String> {
        lock(&self.inner).parked_order.iter().cloned().collect()
    }

    /// Names with at least one subscriber.
    pub fn active_tokens(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.inner).feeds.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).lifecycle == Lifecycle::Running
    }

    pub fn activity(&self) -> FeedSnapshot {
        let active = lock(&self.inner).feeds.len();
        self.activity.snapshot(active, Instant::now())
    }

    fn spawn_timer(
        &self,
        scheduler: &Scheduler,
        token_name: &str,
        generator: Arc<Mutex<UpdateGenerator>>,
    ) -> TimerHandle {
        let delay_source = generator.clone();
        let registry = Arc::downgrade(&self.inner);
        let activity = self.activity.clone();
        let name = token_name.to_string();

        scheduler.schedule_repeating(
            token_name,
            move || lock(&delay_source).next_interval(),
            move || {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                let now = Instant::now();
                let event = lock(&generator).tick(now);
                activity.record(now);
                deliver(&registry, &name, &event);
            },
        )
    }
}

/// Hand `event` to the current subscribers of `token_name`, outside the lock.
fn deliver(registry: &Mutex<RegistryInner>, token_name: &str, event: &UpdateEvent) {
    let targets: Vec<(UpdateCallback, Arc<AtomicBool>)> = match lock(registry).feeds.get(token_name) {
        Some(feed) => feed
            .registrations
            .iter()
            .map(|r| (r.callback.clone(), r.active.clone()))
            .collect(),
        None => return,
    };

    for (callback, active) in targets {
        // A callback earlier in this loop may have unsubscribed a later one.
        if active.load(Ordering::SeqCst) {
            callback(event);
        }
    }
}

fn remove_registration(registry: &Mutex<RegistryInner>, token_name: &str, id: Uuid) {
    let mut inner = lock(registry);
    let Some(feed) = inner.feeds.get_mut(token_name) else {
        return;
    };
    let Some(position) = feed.registrations.iter().position(|r| r.id == id) else {
        return;
    };

    let removed = feed.registrations.remove(position);
    let remaining = feed.registrations.len();

    let mut stopped = None;
    if remaining == 0 {
        if let Some(mut feed) = inner.feeds.remove(token_name) {
            if let Some(timer) = feed.timer.as_mut() {
                timer.cancel();
            }
            if inner.retain_state {
                inner.park(token_name, feed.generator.clone());
            }
            stopped = Some(feed);
        }
    }
    drop(inner);

    // Callbacks may own other subscriptions; drop them unlocked.
    drop(removed);
    match stopped {
        Some(feed) => {
            info!("⏹️ Stopped live updates for {}", token_name);
            drop(feed);
        }
        None => debug!("Subscriber left {} ({} remaining)", token_name, remaining),
    }
}

/// Handle to one registration. Unsubscribes when dropped.
pub struct Subscription {
    id: Uuid,
    token_name: String,
    active: Arc<AtomicBool>,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop receiving updates. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            remove_registration(&registry, &self.token_name, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("token_name", &self.token_name)
            .field("active", &self.is_active())
            .finish()
    }
}
