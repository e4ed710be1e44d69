use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::format;
use crate::live::lock;
use crate::models::{Section, TokenRecord};
use crate::view::SectionMap;

/// How many update times are kept for the average interval
const INTERVAL_WINDOW: usize = 10;

/// Activity of the simulated feed, as shown by the live-data indicator.
#[derive(Debug)]
pub struct FeedActivity {
    started_at: Instant,
    inner: Mutex<ActivityInner>,
}

#[derive(Debug, Default)]
struct ActivityInner {
    total_updates: u64,
    recent: VecDeque<Instant>,
}

impl FeedActivity {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            inner: Mutex::new(ActivityInner::default()),
        }
    }

    pub fn record(&self, at: Instant) {
        let mut inner = lock(&self.inner);
        inner.total_updates += 1;
        inner.recent.push_back(at);
        while inner.recent.len() > INTERVAL_WINDOW {
            inner.recent.pop_front();
        }
    }

    pub fn snapshot(&self, active_tokens: usize, now: Instant) -> FeedSnapshot {
        let inner = lock(&self.inner);
        let last_update = inner.recent.back().copied();

        let avg_update_interval = if inner.recent.len() < 2 {
            Duration::ZERO
        } else {
            let intervals = inner.recent.len() as u32 - 1;
            let span = inner.recent[inner.recent.len() - 1].saturating_duration_since(inner.recent[0]);
            span / intervals
        };

        FeedSnapshot {
            active_tokens,
            total_updates: inner.total_updates,
            uptime: now.saturating_duration_since(self.started_at),
            avg_update_interval,
            since_last_update: last_update.map(|t| now.saturating_duration_since(t)),
        }
    }
}

impl Default for FeedActivity {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub active_tokens: usize,
    pub total_updates: u64,
    pub uptime: Duration,
    pub avg_update_interval: Duration,
    pub since_last_update: Option<Duration>,
}

impl FeedSnapshot {
    /// "now", "12s ago", "3m ago"; "never" before the first update.
    pub fn time_since_update(&self) -> String {
        match self.since_last_update {
            Some(elapsed) => format::time_since_label(elapsed),
            None => "never".to_string(),
        }
    }
}

/// Aggregates over all merged tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenStats {
    pub total_tokens: usize,
    pub total_holders: u64,
    pub total_volume: f64,
    pub average_change: f64,
    pub positive_changes: usize,
    pub negative_changes: usize,
    pub no_changes: usize,
    pub section_stats: SectionMap<usize>,
}

impl TokenStats {
    pub fn from_tokens(tokens: &[TokenRecord]) -> Self {
        let total_tokens = tokens.len();
        let total_holders = tokens.iter().map(|t| t.holders_value).sum();
        let total_volume = tokens.iter().map(|t| t.volume_24h_value).sum();
        let average_change = if total_tokens == 0 {
            0.0
        } else {
            tokens.iter().map(|t| t.change_24h_value).sum::<f64>() / total_tokens as f64
        };

        let positive_changes = tokens.iter().filter(|t| t.change_24h_value > 0.0).count();
        let negative_changes = tokens.iter().filter(|t| t.change_24h_value < 0.0).count();

        let mut section_stats = SectionMap::<usize>::default();
        for token in tokens {
            *section_stats.get_mut(token.section) += 1;
        }

        Self {
            total_tokens,
            total_holders,
            total_volume,
            average_change,
            positive_changes,
            negative_changes,
            no_changes: total_tokens - positive_changes - negative_changes,
            section_stats,
        }
    }

    pub fn section_count(&self, section: Section) -> usize {
        *self.section_stats.get(section)
    }
}
