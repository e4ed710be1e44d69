use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Directional bias of a simulated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Bullish, Trend::Bearish, Trend::Sideways];

    /// Mean of the per-tick move as a fraction of the allowed swing.
    pub fn bias(&self) -> f64 {
        match self {
            Self::Bullish => 0.35,
            Self::Bearish => -0.35,
            Self::Sideways => 0.0,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Sideways => write!(f, "sideways"),
        }
    }
}

/// Numeric market snapshot for one subscribed token. Only the token's own generator writes it.
#[derive(Debug, Clone)]
pub struct MarketState {
    pub price: f64,
    pub price_usd: f64,
    /// 24h change in percent
    pub change_24h: f64,
    pub volume_24h: f64,
    /// Volume the walk keeps drifting back toward
    pub base_volume: f64,
    pub holders: u64,
    pub trend: Trend,
    pub volatility: f64,
    pub last_update: Instant,
}

/// Which field moved the most on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Price,
    Volume,
    Holders,
    All,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Volume => write!(f, "volume"),
            Self::Holders => write!(f, "holders"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A group of token fields an update may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    /// `price` and `priceUSD`
    Price,
    /// `change24h` and its numeric value
    Change,
    /// `volume24h` and its numeric value
    Volume,
    /// `holders` and its numeric value
    Holders,
}

impl TokenField {
    const fn bit(self) -> u8 {
        match self {
            Self::Price => 1,
            Self::Change => 1 << 1,
            Self::Volume => 1 << 2,
            Self::Holders => 1 << 3,
        }
    }
}

/// Explicit set of fields present in an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(u8);

impl FieldSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b1111)
    }

    pub const fn with(self, field: TokenField) -> Self {
        Self(self.0 | field.bit())
    }

    pub fn insert(&mut self, field: TokenField) {
        self.0 |= field.bit();
    }

    pub fn contains(&self, field: TokenField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<TokenField> for FieldSet {
    fn from_iter<I: IntoIterator<Item = TokenField>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |set, field| set.with(field))
    }
}

/// Display values before a tick, kept for transition rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousValues {
    pub price: String,
    pub price_usd: String,
    pub price_usd_value: f64,
    pub change_24h: String,
    pub volume_24h: String,
    pub holders: String,
    pub change_24h_value: f64,
}

/// Immutable snapshot handed to every subscriber of a token.
///
/// Only the fields in `fields` are meant to be applied; the rest mirror the
/// generator's current state and are ignored by the merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub token_name: String,
    pub timestamp: DateTime<Utc>,
    pub update_type: UpdateType,
    pub fields: FieldSet,

    pub price: String,
    pub price_usd: String,
    pub price_usd_value: f64,
    pub change_24h: String,
    pub change_24h_value: f64,
    pub volume_24h: String,
    pub volume_24h_value: f64,
    pub holders: String,
    pub holders_value: u64,

    pub previous: Option<PreviousValues>,
}

impl UpdateEvent {
    pub fn has(&self, field: TokenField) -> bool {
        self.fields.contains(field)
    }

    /// Whether the price moved up relative to the previous tick.
    pub fn is_increasing(&self) -> Option<bool> {
        let previous = self.previous.as_ref()?;
        Some(self.price_usd_value > previous.price_usd_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_membership() {
        let set = FieldSet::empty().with(TokenField::Price).with(TokenField::Volume);
        assert!(set.contains(TokenField::Price));
        assert!(set.contains(TokenField::Volume));
        assert!(!set.contains(TokenField::Holders));
        assert!(!set.contains(TokenField::Change));
        assert!(FieldSet::empty().is_empty());
    }

    #[test]
    fn test_field_set_all_covers_every_field() {
        let all = FieldSet::all();
        for field in [TokenField::Price, TokenField::Change, TokenField::Volume, TokenField::Holders] {
            assert!(all.contains(field));
        }
        let collected: FieldSet = [TokenField::Price, TokenField::Change, TokenField::Volume, TokenField::Holders]
            .into_iter()
            .collect();
        assert_eq!(collected, all);
    }

    #[test]
    fn test_trend_bias_sign() {
        assert!(Trend::Bullish.bias() > 0.0);
        assert!(Trend::Bearish.bias() < 0.0);
        assert_eq!(Trend::Sideways.bias(), 0.0);
    }

    fn event_moving(from: f64, to: f64) -> UpdateEvent {
        UpdateEvent {
            token_name: "Drift".to_string(),
            timestamp: Utc::now(),
            update_type: UpdateType::Price,
            fields: FieldSet::all(),
            price: String::new(),
            price_usd: crate::format::format_usd(to),
            price_usd_value: to,
            change_24h: "+0.00%".to_string(),
            change_24h_value: 0.0,
            volume_24h: "$0".to_string(),
            volume_24h_value: 0.0,
            holders: "1".to_string(),
            holders_value: 1,
            previous: Some(PreviousValues {
                price: String::new(),
                price_usd: crate::format::format_usd(from),
                price_usd_value: from,
                change_24h: "+0.00%".to_string(),
                volume_24h: "$0".to_string(),
                holders: "1".to_string(),
                change_24h_value: 0.0,
            }),
        }
    }

    #[test]
    fn test_direction_uses_unrounded_prices() {
        // Both prices display as "$0.0421".
        let falling = event_moving(0.04214, 0.04213);
        assert_eq!(falling.price_usd, falling.previous.as_ref().unwrap().price_usd);
        assert_eq!(falling.is_increasing(), Some(false));

        assert_eq!(event_moving(0.04213, 0.04214).is_increasing(), Some(true));

        let first = UpdateEvent { previous: None, ..falling };
        assert_eq!(first.is_increasing(), None);
    }

    #[test]
    fn test_update_type_serde() {
        assert_eq!(serde_json::to_string(&UpdateType::Volume).unwrap(), "\"volume\"");
        assert_eq!(UpdateType::All.to_string(), "all");
    }
}
