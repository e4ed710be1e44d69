//! Filter, sort and group pipeline.
//!
//! [`derive_view`] is a pure function of the merged tokens, the filter
//! criteria and the sort key. It is cheap enough at catalog scale to rerun
//! wholesale whenever any input changes.

pub mod filter;
pub mod sort;

use serde::Serialize;
use tracing::debug;

use crate::format;
use crate::models::{Section, TokenRecord};

pub use filter::FilterCriteria;
pub use sort::{sort_tokens, SortKey};

/// One value per section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionMap<T> {
    #[serde(rename = "New Pairs")]
    pub new_pairs: T,
    #[serde(rename = "Final Stretch")]
    pub final_stretch: T,
    #[serde(rename = "Migrated")]
    pub migrated: T,
}

impl<T> SectionMap<T> {
    pub fn from_fn<F: FnMut(Section) -> T>(mut f: F) -> Self {
        Self {
            new_pairs: f(Section::NewPairs),
            final_stretch: f(Section::FinalStretch),
            migrated: f(Section::Migrated),
        }
    }

    pub fn get(&self, section: Section) -> &T {
        match section {
            Section::NewPairs => &self.new_pairs,
            Section::FinalStretch => &self.final_stretch,
            Section::Migrated => &self.migrated,
        }
    }

    pub fn get_mut(&mut self, section: Section) -> &mut T {
        match section {
            Section::NewPairs => &mut self.new_pairs,
            Section::FinalStretch => &mut self.final_stretch,
            Section::Migrated => &mut self.migrated,
        }
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &T)> {
        Section::ALL.into_iter().map(move |section| (section, self.get(section)))
    }
}

/// What the grid renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    /// Filtered and sorted
    pub tokens: Vec<TokenRecord>,
    pub by_section: SectionMap<Vec<TokenRecord>>,
    /// Badge counts over every merged token, unaffected by any filter
    pub section_counts: SectionMap<usize>,
    pub total_count: usize,
    pub has_results: bool,
}

impl DerivedView {
    /// Tokens shown in a single-section tab.
    pub fn tab(&self, section: Section) -> &[TokenRecord] {
        self.by_section.get(section)
    }
}

pub fn derive_view(entities: &[TokenRecord], criteria: &FilterCriteria, sort: SortKey) -> DerivedView {
    let mut tokens: Vec<TokenRecord> = entities.iter().filter(|t| criteria.matches(t)).cloned().collect();
    sort_tokens(&mut tokens, sort);

    let mut by_section = SectionMap::<Vec<TokenRecord>>::default();
    for token in &tokens {
        by_section.get_mut(token.section).push(token.clone());
    }

    let section_counts = SectionMap::from_fn(|section| entities.iter().filter(|t| t.section == section).count());

    let total_count = tokens.len();
    debug!(
        "Derived view: {} of {} tokens, sorted by {}",
        total_count,
        entities.len(),
        sort.as_str()
    );

    DerivedView {
        tokens,
        by_section,
        section_counts,
        total_count,
        has_results: total_count > 0,
    }
}

/// Holder count, falling back to the display string when the numeric value is missing.
pub(crate) fn holder_count(token: &TokenRecord) -> u64 {
    if token.holders_value != 0 {
        token.holders_value
    } else {
        format::parse_integer(&token.holders)
    }
}

pub(crate) fn usd_price(token: &TokenRecord) -> f64 {
    format::parse_numeric(&token.price_usd)
}
