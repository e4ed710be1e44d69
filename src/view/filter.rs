use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{Section, TokenRecord};
use crate::view::{holder_count, usd_price};

/// What the user narrowed the grid down to. Replaced wholesale on every edit.
///
/// `None` bounds are unbounded. Infinite or NaN bounds are treated the same
/// way, so values carried over from a UI's `±Infinity` sentinels still work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub min_holders: Option<u64>,
    pub max_holders: Option<u64>,
    pub min_change: Option<f64>,
    pub max_change: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sections: BTreeSet<Section>,
    pub search_query: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_holders: Some(0),
            max_holders: None,
            min_change: None,
            max_change: None,
            min_price: Some(0.0),
            max_price: None,
            sections: Section::ALL.into_iter().collect(),
            search_query: String::new(),
        }
    }
}

impl FilterCriteria {
    /// Nothing filtered out at all, including zero-priced records.
    pub fn unbounded() -> Self {
        Self {
            min_holders: None,
            min_price: None,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, query: &str) -> Self {
        self.search_query = query.to_string();
        self
    }

    pub fn with_sections<I: IntoIterator<Item = Section>>(mut self, sections: I) -> Self {
        self.sections = sections.into_iter().collect();
        self
    }

    /// Same criteria, limited to one section (the mobile single-column tab).
    pub fn restricted_to(&self, section: Section) -> Self {
        let mut criteria = self.clone();
        criteria.sections.retain(|s| *s == section);
        criteria
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether anything differs from a filter that shows every token.
    pub fn has_active_filters(&self) -> bool {
        !self.search_query.trim().is_empty()
            || self.min_holders.unwrap_or(0) > 0
            || self.max_holders.is_some()
            || bound(self.min_change).is_some()
            || bound(self.max_change).is_some()
            || bound(self.min_price).map_or(false, |min| min > 0.0)
            || bound(self.max_price).is_some()
            || self.sections.len() < Section::ALL.len()
    }

    pub fn matches(&self, token: &TokenRecord) -> bool {
        self.matches_section(token)
            && self.matches_search(token)
            && self.matches_holders(token)
            && self.matches_price(token)
            && self.matches_change(token)
    }

    pub fn matches_section(&self, token: &TokenRecord) -> bool {
        self.sections.contains(&token.section)
    }

    /// Case-insensitive substring match on name, full name, symbol and tags.
    pub fn matches_search(&self, token: &TokenRecord) -> bool {
        let query = self.search_query.trim().to_lowercase();
        query.is_empty() || token.search_text().contains(&query)
    }

    pub fn matches_holders(&self, token: &TokenRecord) -> bool {
        let holders = holder_count(token);
        self.min_holders.map_or(true, |min| holders >= min) && self.max_holders.map_or(true, |max| holders <= max)
    }

    pub fn matches_price(&self, token: &TokenRecord) -> bool {
        within(usd_price(token), self.min_price, self.max_price)
    }

    pub fn matches_change(&self, token: &TokenRecord) -> bool {
        within(token.change_24h_value, self.min_change, self.max_change)
    }
}

fn bound(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    bound(min).map_or(true, |min| value >= min) && bound(max).map_or(true, |max| value <= max)
}
