//! Update Generator
//!
//! Simulated market evolution for a single token. Each generator owns its
//! [`MarketState`] and, when ticked, nudges price, change, volume and holders
//! with a trend-biased random walk and emits an [`UpdateEvent`] describing
//! the new values and the ones they replaced.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;

use crate::format;
use crate::models::{FieldSet, MarketState, PreviousValues, TokenField, Trend, UpdateEvent, UpdateType};

/// SOL/USD rate used to derive the native price from the USD price
const SOL_PRICE_USD: f64 = 150.0;

/// Floors that keep the walk away from zero and NaN
const MIN_PRICE_USD: f64 = 1e-10;
const MIN_HOLDERS: u64 = 1;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Bounds of the randomized delay between ticks
    pub min_tick: Duration,
    pub max_tick: Duration,
    /// Master seed; every token draws its own seed from it
    pub seed: Option<u64>,
    /// Keep market state after the last subscriber leaves so a resubscribe resumes the walk
    pub retain_state_on_stop: bool,
    /// Most stopped generators kept for resuming; the longest-parked go first
    pub max_parked: usize,

    /// Chance per tick that the trend is redrawn
    pub trend_change_probability: f64,
    /// Chance per tick that the holder count moves
    pub holder_change_probability: f64,
    /// Cap on the elapsed-time multiplier applied to the swing
    pub max_elapsed_factor: f64,
    pub volatility_range: (f64, f64),
    /// Allowed band for the 24h change, in percent
    pub change_bounds: (f64, f64),
    /// Allowed band for the 24h volume, in USD
    pub volume_bounds: (f64, f64),
    /// Strength of the pull back toward the starting volume, per tick
    pub volume_reversion: f64,

    /// Price move (fraction) above which a tick counts as a price update
    pub price_swing_threshold: f64,
    /// Volume move (fraction) above which a tick counts as a volume update
    pub volume_swing_threshold: f64,
    /// Holder delta above which a tick counts as a holders update
    pub holder_swing_threshold: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_tick: Duration::from_millis(1000),
            max_tick: Duration::from_millis(4000),
            seed: None,
            retain_state_on_stop: true,
            max_parked: 256,
            trend_change_probability: 0.05,
            holder_change_probability: 0.3,
            max_elapsed_factor: 3.0,
            volatility_range: (0.01, 0.08),
            change_bounds: (-99.0, 500.0),
            volume_bounds: (100.0, 5_000_000_000.0),
            volume_reversion: 0.2,
            price_swing_threshold: 0.02,
            volume_swing_threshold: 0.05,
            holder_swing_threshold: 10,
        }
    }
}

impl MarketState {
    /// Random but plausible starting point for a freshly subscribed token.
    pub fn random<R: Rng>(rng: &mut R, config: &GeneratorConfig, now: Instant) -> Self {
        let price_usd = 10f64.powf(rng.gen_range(-5.0..0.5));
        let (min_vol, max_vol) = config.volatility_range;
        let volume = bounded_volume(10f64.powf(rng.gen_range(3.0..6.3)), config);

        Self {
            price: price_usd / SOL_PRICE_USD,
            price_usd,
            change_24h: rng.gen_range(-50.0..150.0),
            volume_24h: volume,
            base_volume: volume,
            holders: rng.gen_range(50..25_000),
            trend: Trend::ALL[rng.gen_range(0..Trend::ALL.len())],
            volatility: rng.gen_range(min_vol..=max_vol),
            last_update: now,
        }
    }

    fn previous_values(&self) -> PreviousValues {
        PreviousValues {
            price: format::format_price(self.price),
            price_usd: format::format_usd(self.price_usd),
            price_usd_value: self.price_usd,
            change_24h: format::format_change(self.change_24h),
            volume_24h: format::format_volume(self.volume_24h),
            holders: format::format_holders(self.holders),
            change_24h_value: self.change_24h,
        }
    }
}

fn bounded_volume(volume: f64, config: &GeneratorConfig) -> f64 {
    let (min_volume, max_volume) = config.volume_bounds;
    volume.max(min_volume).min(max_volume)
}

pub struct UpdateGenerator {
    token_name: String,
    state: MarketState,
    rng: StdRng,
    config: GeneratorConfig,
}

impl UpdateGenerator {
    /// Start a generator with a random baseline drawn from `seed`.
    pub fn new(token_name: &str, seed: u64, config: GeneratorConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = MarketState::random(&mut rng, &config, Instant::now());
        Self {
            token_name: token_name.to_string(),
            state,
            rng,
            config,
        }
    }

    /// Start a generator from a known state.
    pub fn with_state(token_name: &str, state: MarketState, seed: u64, config: GeneratorConfig) -> Self {
        Self {
            token_name: token_name.to_string(),
            state,
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    /// Delay until the next tick, drawn fresh each cycle so tokens drift apart.
    pub fn next_interval(&mut self) -> Duration {
        let min = self.config.min_tick;
        let max = self.config.max_tick.max(min);
        if min == max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Advance the walk to `now` and describe the result.
    pub fn tick(&mut self, now: Instant) -> UpdateEvent {
        let previous = self.state.previous_values();
        let elapsed = now.saturating_duration_since(self.state.last_update).as_secs_f64();

        if self.rng.gen_bool(self.config.trend_change_probability.clamp(0.0, 1.0)) {
            self.state.trend = Trend::ALL[self.rng.gen_range(0..Trend::ALL.len())];
        }

        // Longer gaps allow bigger swings, up to the cap.
        let elapsed_factor = elapsed.max(0.1).sqrt().min(self.config.max_elapsed_factor);
        let swing = self.state.volatility * elapsed_factor;
        let noise: f64 = self.rng.gen_range(-1.0..1.0);
        let price_move = swing * (self.state.trend.bias() + noise * 0.65);

        let price_usd = self.state.price_usd * (1.0 + price_move);
        self.state.price_usd = if price_usd.is_finite() {
            price_usd.max(MIN_PRICE_USD)
        } else {
            MIN_PRICE_USD
        };
        self.state.price = self.state.price_usd / SOL_PRICE_USD;

        let (min_change, max_change) = self.config.change_bounds;
        let change = self.state.change_24h + price_move * 100.0;
        self.state.change_24h = if change.is_finite() {
            change.clamp(min_change, max_change)
        } else {
            0.0
        };

        // Volume follows the size of the price move and drifts back toward its baseline.
        let current = bounded_volume(self.state.volume_24h, &self.config);
        let base = bounded_volume(self.state.base_volume, &self.config);
        let reversion = self.config.volume_reversion * (base / current).ln();
        let volume_move =
            price_move.abs() * self.rng.gen_range(0.5..1.5) + self.rng.gen_range(-0.03..0.03) + reversion;
        let volume = current * volume_move.exp();
        self.state.volume_24h = if volume.is_finite() {
            bounded_volume(volume, &self.config)
        } else {
            base
        };

        let mut holder_delta: i64 = 0;
        if self.rng.gen_bool(self.config.holder_change_probability.clamp(0.0, 1.0)) {
            holder_delta = self.rng.gen_range(-3..=12);
            let holders = (self.state.holders as i64 + holder_delta).max(MIN_HOLDERS as i64);
            holder_delta = holders - self.state.holders as i64;
            self.state.holders = holders as u64;
        }

        self.state.last_update = now;

        let mut fields = FieldSet::empty()
            .with(TokenField::Price)
            .with(TokenField::Change)
            .with(TokenField::Volume);
        if holder_delta != 0 {
            fields.insert(TokenField::Holders);
        }

        let update_type = if price_move.abs() >= self.config.price_swing_threshold {
            UpdateType::Price
        } else if volume_move.abs() >= self.config.volume_swing_threshold {
            UpdateType::Volume
        } else if holder_delta.unsigned_abs() >= self.config.holder_swing_threshold {
            UpdateType::Holders
        } else {
            UpdateType::All
        };

        UpdateEvent {
            token_name: self.token_name.clone(),
            timestamp: Utc::now(),
            update_type,
            fields,
            price: format::format_price(self.state.price),
            price_usd: format::format_usd(self.state.price_usd),
            price_usd_value: self.state.price_usd,
            change_24h: format::format_change(self.state.change_24h),
            change_24h_value: self.state.change_24h,
            volume_24h: format::format_volume(self.state.volume_24h),
            volume_24h_value: self.state.volume_24h,
            holders: format::format_holders(self.state.holders),
            holders_value: self.state.holders,
            previous: Some(previous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(change: f64, trend: Trend, volatility: f64) -> MarketState {
        MarketState {
            price: 0.01 / SOL_PRICE_USD,
            price_usd: 0.01,
            change_24h: change,
            volume_24h: 10_000.0,
            base_volume: 10_000.0,
            holders: 100,
            trend,
            volatility,
            last_update: Instant::now(),
        }
    }

    #[test]
    fn test_random_state_within_bounds() {
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let s = MarketState::random(&mut rng, &config, Instant::now());
            assert!(s.price_usd > 0.0);
            assert!((-50.0..150.0).contains(&s.change_24h));
            assert!(s.volume_24h > 0.0);
            assert!(s.holders >= 50);
            assert!(s.volatility >= 0.01 && s.volatility <= 0.08);
        }
    }

    #[test]
    fn test_same_seed_same_walk() {
        let start = Instant::now();
        let mut a = UpdateGenerator::with_state("A", state(10.0, Trend::Sideways, 0.05), 9, GeneratorConfig::default());
        let mut b = UpdateGenerator::with_state("A", state(10.0, Trend::Sideways, 0.05), 9, GeneratorConfig::default());
        for i in 1..20 {
            let now = start + Duration::from_secs(i);
            assert_eq!(a.tick(now).price_usd_value, b.tick(now).price_usd_value);
        }
    }

    #[test]
    fn test_change_never_exceeds_upper_clamp() {
        let config = GeneratorConfig {
            trend_change_probability: 0.0,
            ..GeneratorConfig::default()
        };
        let start = Instant::now();
        let mut gen = UpdateGenerator::with_state("Pump", state(499.5, Trend::Bullish, 0.08), 1, config);

        for i in 1..=2_000u64 {
            let event = gen.tick(start + Duration::from_secs(i * 10));
            assert!(event.change_24h_value <= 500.0, "tick {} emitted {}", i, event.change_24h_value);
            assert!(event.change_24h_value >= -99.0);
        }
    }

    #[test]
    fn test_volume_reverts_and_stays_bounded() {
        let config = GeneratorConfig::default();
        let (min_volume, max_volume) = config.volume_bounds;
        let start = Instant::now();
        let mut gen = UpdateGenerator::new("Vol", 42, config);
        let base = gen.state().base_volume;

        for i in 1..=20_000u64 {
            let event = gen.tick(start + Duration::from_millis(i * 2_500));
            let volume = event.volume_24h_value;
            assert!(volume.is_finite());
            assert!(volume >= min_volume && volume <= max_volume, "tick {} volume {}", i, volume);
            assert!(volume > base / 10.0 && volume < base * 10.0, "tick {} volume {} base {}", i, volume, base);
        }
    }

    #[test]
    fn test_volume_clamped_to_bounds() {
        let config = GeneratorConfig {
            volume_bounds: (1_000.0, 20_000.0),
            volume_reversion: 0.0,
            ..GeneratorConfig::default()
        };
        let start = Instant::now();
        let mut s = state(0.0, Trend::Bullish, 0.08);
        s.volume_24h = 19_000.0;
        let mut gen = UpdateGenerator::with_state("Cap", s, 8, config);

        for i in 1..=2_000u64 {
            let volume = gen.tick(start + Duration::from_secs(i * 10)).volume_24h_value;
            assert!((1_000.0..=20_000.0).contains(&volume), "tick {} volume {}", i, volume);
        }
    }

    #[test]
    fn test_values_stay_non_negative() {
        let config = GeneratorConfig {
            trend_change_probability: 0.0,
            holder_change_probability: 1.0,
            ..GeneratorConfig::default()
        };
        let start = Instant::now();
        let mut s = state(-90.0, Trend::Bearish, 0.08);
        s.holders = 1;
        let mut gen = UpdateGenerator::with_state("Dump", s, 3, config);

        for i in 1..=2_000u64 {
            let event = gen.tick(start + Duration::from_secs(i * 5));
            assert!(event.price_usd_value >= MIN_PRICE_USD);
            assert!(event.price_usd_value.is_finite());
            assert!(event.volume_24h_value >= 0.0);
            assert!(event.holders_value >= MIN_HOLDERS);
        }
    }

    #[test]
    fn test_event_carries_previous_values() {
        let start = Instant::now();
        let mut gen = UpdateGenerator::with_state("Prev", state(5.0, Trend::Sideways, 0.05), 4, GeneratorConfig::default());
        let first = gen.tick(start + Duration::from_secs(2));
        let second = gen.tick(start + Duration::from_secs(4));

        let previous = second.previous.expect("previous values");
        assert_eq!(previous.price_usd, first.price_usd);
        assert_eq!(previous.change_24h, first.change_24h);
        assert_eq!(previous.change_24h_value, first.change_24h_value);
        assert_eq!(previous.price_usd_value, first.price_usd_value);
        assert_eq!(second.token_name, "Prev");
    }

    #[test]
    fn test_fields_and_update_type_consistent() {
        let start = Instant::now();
        let config = GeneratorConfig::default();
        let mut gen = UpdateGenerator::with_state("Mix", state(0.0, Trend::Sideways, 0.05), 11, config.clone());

        for i in 1..=500u64 {
            let before = gen.state().holders;
            let event = gen.tick(start + Duration::from_secs(i));
            assert!(event.has(TokenField::Price));
            assert!(event.has(TokenField::Change));
            assert!(event.has(TokenField::Volume));
            assert_eq!(event.has(TokenField::Holders), event.holders_value != before);
            if event.update_type == UpdateType::Holders {
                assert!(event.holders_value.abs_diff(before) >= config.holder_swing_threshold);
            }
        }
    }

    #[test]
    fn test_next_interval_within_bounds() {
        let config = GeneratorConfig {
            min_tick: Duration::from_millis(1_000),
            max_tick: Duration::from_millis(10_000),
            ..GeneratorConfig::default()
        };
        let mut gen = UpdateGenerator::new("Jitter", 5, config);
        let draws: Vec<Duration> = (0..100).map(|_| gen.next_interval()).collect();
        assert!(draws.iter().all(|d| *d >= Duration::from_secs(1) && *d <= Duration::from_secs(10)));
        assert!(draws.windows(2).any(|w| w[0] != w[1]));
    }
}
