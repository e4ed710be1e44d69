//! Live View Merge
//!
//! Overlays the latest [`UpdateEvent`] for each token onto its catalog record.
//! Only the fields an event marks as present are applied, so a volume-only
//! tick never clobbers price or holders.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::live::lock;
use crate::live::registry::{Subscription, SubscriptionRegistry};
use crate::live::stats::TokenStats;
use crate::models::{Section, TokenField, TokenRecord, UpdateEvent};

/// Apply the fields present in `event` to `record`. Applying the same event
/// twice leaves the record as applying it once.
pub fn merge_update(record: &mut TokenRecord, event: &UpdateEvent) {
    if event.has(TokenField::Price) {
        record.price = event.price.clone();
        record.price_usd = event.price_usd.clone();
    }
    if event.has(TokenField::Change) {
        record.change_24h = event.change_24h.clone();
        record.change_24h_value = event.change_24h_value;
    }
    if event.has(TokenField::Volume) {
        record.volume_24h = event.volume_24h.clone();
        record.volume_24h_value = event.volume_24h_value;
    }
    if event.has(TokenField::Holders) {
        record.holders = event.holders.clone();
        record.holders_value = event.holders_value;
    }
}

#[derive(Debug)]
struct MergeState {
    /// Catalog order, with updates folded in
    tokens: Vec<TokenRecord>,
    index: HashMap<String, usize>,
    latest: HashMap<String, UpdateEvent>,
}

impl MergeState {
    fn apply(&mut self, event: &UpdateEvent) -> bool {
        let Some(&position) = self.index.get(&event.token_name) else {
            debug!("Ignoring update for unknown token {}", event.token_name);
            return false;
        };
        merge_update(&mut self.tokens[position], event);
        self.latest.insert(event.token_name.clone(), event.clone());
        true
    }
}

/// Merged view of the catalog, kept current by registry callbacks.
pub struct LiveTokens {
    state: Arc<Mutex<MergeState>>,
    version: Arc<watch::Sender<u64>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl LiveTokens {
    pub fn new(catalog: &Catalog) -> Self {
        let tokens = catalog.tokens().to_vec();
        let index = tokens
            .iter()
            .enumerate()
            .map(|(position, token)| (token.name.clone(), position))
            .collect();
        let (version, _) = watch::channel(0);

        Self {
            state: Arc::new(Mutex::new(MergeState {
                tokens,
                index,
                latest: HashMap::new(),
            })),
            version: Arc::new(version),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Fold one update into the view. Returns `false` for unknown tokens.
    pub fn apply(&self, event: &UpdateEvent) -> bool {
        apply_and_notify(&self.state, &self.version, event)
    }

    /// Subscribe every catalog token on `registry`.
    pub fn attach(&self, registry: &SubscriptionRegistry) {
        let names: Vec<String> = lock(&self.state).tokens.iter().map(|t| t.name.clone()).collect();

        let mut subscriptions = Vec::with_capacity(names.len());
        for name in &names {
            let state = self.state.clone();
            let version = self.version.clone();
            subscriptions.push(registry.subscribe(name, move |event| {
                apply_and_notify(&state, &version, event);
            }));
        }

        info!("🔗 Live view attached to {} tokens", subscriptions.len());
        lock(&self.subscriptions).extend(subscriptions);
    }

    /// Drop every subscription made by [`attach`](Self::attach). Merged values are kept.
    pub fn detach(&self) {
        let subscriptions = std::mem::take(&mut *lock(&self.subscriptions));
        if !subscriptions.is_empty() {
            info!("Live view detached from {} tokens", subscriptions.len());
        }
        drop(subscriptions);
    }

    /// All merged tokens, in catalog order.
    pub fn tokens(&self) -> Vec<TokenRecord> {
        lock(&self.state).tokens.clone()
    }

    pub fn get(&self, name: &str) -> Option<TokenRecord> {
        let state = lock(&self.state);
        state.index.get(name).map(|&position| state.tokens[position].clone())
    }

    pub fn by_section(&self, section: Section) -> Vec<TokenRecord> {
        lock(&self.state)
            .tokens
            .iter()
            .filter(|t| t.section == section)
            .cloned()
            .collect()
    }

    pub fn latest_update(&self, name: &str) -> Option<UpdateEvent> {
        lock(&self.state).latest.get(name).cloned()
    }

    pub fn stats(&self) -> TokenStats {
        TokenStats::from_tokens(&lock(&self.state).tokens)
    }

    /// Bumped after every applied update.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }
}

impl Drop for LiveTokens {
    fn drop(&mut self) {
        self.detach();
    }
}

fn apply_and_notify(state: &Mutex<MergeState>, version: &watch::Sender<u64>, event: &UpdateEvent) -> bool {
    let applied = lock(state).apply(event);
    if applied {
        version.send_modify(|v| *v += 1);
    }
    applied
}
