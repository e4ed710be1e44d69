use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle bucket a token is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "New Pairs")]
    NewPairs,
    #[serde(rename = "Final Stretch")]
    FinalStretch,
    #[serde(rename = "Migrated")]
    Migrated,
}

impl Section {
    /// Display order used by the grid columns.
    pub const ALL: [Section; 3] = [Section::NewPairs, Section::FinalStretch, Section::Migrated];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NewPairs => "New Pairs",
            Self::FinalStretch => "Final Stretch",
            Self::Migrated => "Migrated",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new pairs" | "new_pairs" | "newpairs" => Ok(Self::NewPairs),
            "final stretch" | "final_stretch" | "finalstretch" => Ok(Self::FinalStretch),
            "migrated" => Ok(Self::Migrated),
            other => Err(format!("Unknown section: {}", other)),
        }
    }
}

/// A token as listed in the catalog. Merged live tokens use the same shape,
/// with the market fields overwritten by the latest update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Unique within the catalog; the key for subscriptions
    pub name: String,
    pub full_name: String,
    pub symbol: String,
    pub section: Section,
    #[serde(default)]
    pub icon: String,

    // Display strings
    pub price: String,
    #[serde(rename = "priceUSD")]
    pub price_usd: String,
    pub change_24h: String,
    pub volume_24h: String,
    pub holders: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Listing age, e.g. "3m" or "2h"
    pub time: String,

    // Parsed numeric values
    pub change_24h_value: f64,
    pub volume_24h_value: f64,
    pub holders_value: u64,
}

impl TokenRecord {
    /// Lowercased text the search filter matches against.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.name, &self.full_name, &self.symbol];
        parts.extend(self.tags.iter().map(|t| t.as_str()));
        parts.join(" ").to_lowercase()
    }

    pub fn is_positive_change(&self) -> bool {
        self.change_24h_value >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_serde_uses_display_names() {
        let json = serde_json::to_string(&Section::FinalStretch).unwrap();
        assert_eq!(json, "\"Final Stretch\"");

        let parsed: Section = serde_json::from_str("\"New Pairs\"").unwrap();
        assert_eq!(parsed, Section::NewPairs);
    }

    #[test]
    fn test_section_from_str() {
        assert_eq!("migrated".parse::<Section>().unwrap(), Section::Migrated);
        assert_eq!("Final Stretch".parse::<Section>().unwrap(), Section::FinalStretch);
        assert!("graduated".parse::<Section>().is_err());
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let json = r#"{
            "name": "MoonDoge",
            "fullName": "Moon Doge Inu",
            "symbol": "MDOGE",
            "section": "New Pairs",
            "price": "0.0042",
            "priceUSD": "$0.0042",
            "change24h": "+12.5%",
            "volume24h": "$1.2K",
            "holders": "340",
            "tags": ["meme", "dog"],
            "time": "3m",
            "change24hValue": 12.5,
            "volume24hValue": 1200.0,
            "holdersValue": 340
        }"#;

        let record: TokenRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.full_name, "Moon Doge Inu");
        assert_eq!(record.price_usd, "$0.0042");
        assert_eq!(record.holders_value, 340);
        assert!(record.icon.is_empty());
        assert_eq!(record.search_text(), "moondoge moon doge inu mdoge meme dog");
    }
}
