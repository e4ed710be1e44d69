use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::format;
use crate::models::TokenRecord;
use crate::view::{holder_count, usd_price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Biggest 24h change first
    #[default]
    Trending,
    /// Shortest listing age first
    Newest,
    Volume,
    Holders,
    Price,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Trending,
        SortKey::Newest,
        SortKey::Volume,
        SortKey::Holders,
        SortKey::Price,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Trending => "Trending",
            Self::Newest => "Newest",
            Self::Volume => "Volume",
            Self::Holders => "Holders",
            Self::Price => "Price",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::Newest => "newest",
            Self::Volume => "volume",
            Self::Holders => "holders",
            Self::Price => "price",
        }
    }

    fn compare(&self, a: &TokenRecord, b: &TokenRecord) -> Ordering {
        match self {
            Self::Trending => b.change_24h_value.total_cmp(&a.change_24h_value),
            Self::Newest => format::parse_listing_age(&a.time).cmp(&format::parse_listing_age(&b.time)),
            Self::Volume => volume(b).total_cmp(&volume(a)),
            Self::Holders => holder_count(b).cmp(&holder_count(a)),
            Self::Price => usd_price(b).total_cmp(&usd_price(a)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| format!("Unknown sort option: {}", s))
    }
}

/// Sort in place. Stable, so ties keep their incoming order.
pub fn sort_tokens(tokens: &mut [TokenRecord], key: SortKey) {
    tokens.sort_by(|a, b| key.compare(a, b));
}

fn volume(token: &TokenRecord) -> f64 {
    if token.volume_24h_value != 0.0 {
        token.volume_24h_value
    } else {
        format::parse_numeric(&token.volume_24h)
    }
}
