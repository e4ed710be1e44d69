//! Quick search
//!
//! Instant token lookup, the "popular right now" shortlist, and the small
//! list of recent searches cached on disk between runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{PulseError, PulseResult};
use crate::models::TokenRecord;

/// Results shown in the quick search list
const MAX_SEARCH_RESULTS: usize = 10;

const MAX_RECENT_SEARCHES: usize = 5;

const MAX_POPULAR_TOKENS: usize = 6;

/// 24h change (percent) a token needs to count as popular
const POPULAR_CHANGE_THRESHOLD: f64 = 50.0;

/// Case-insensitive match on name, symbol, full name or any tag. Blank queries match nothing.
pub fn search_tokens(tokens: &[TokenRecord], query: &str) -> Vec<TokenRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    tokens
        .iter()
        .filter(|token| {
            token.name.to_lowercase().contains(&query)
                || token.symbol.to_lowercase().contains(&query)
                || token.full_name.to_lowercase().contains(&query)
                || token.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
        })
        .take(MAX_SEARCH_RESULTS)
        .cloned()
        .collect()
}

/// Fast movers by volume.
pub fn popular_tokens(tokens: &[TokenRecord]) -> Vec<TokenRecord> {
    let mut popular: Vec<TokenRecord> = tokens
        .iter()
        .filter(|token| token.change_24h_value > POPULAR_CHANGE_THRESHOLD)
        .cloned()
        .collect();
    popular.sort_by(|a, b| b.volume_24h_value.total_cmp(&a.volume_24h_value));
    popular.truncate(MAX_POPULAR_TOKENS);
    popular
}

/// Most recent first, without duplicates, persisted as a JSON array.
pub struct RecentSearches {
    entries: Arc<RwLock<Vec<String>>>,
    persistence_path: PathBuf,
}

impl RecentSearches {
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            persistence_path: path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.persistence_path
    }

    /// Read the cached list. A missing, unreadable or corrupt file leaves the list empty.
    pub async fn load(&self) {
        let data = match tokio::fs::read_to_string(&self.persistence_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No recent searches at {:?}", self.persistence_path);
                return;
            }
            Err(e) => {
                warn!("Could not read recent searches from {:?}: {}", self.persistence_path, e);
                return;
            }
        };

        let loaded = match serde_json::from_str::<Vec<String>>(&data) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Discarding corrupt recent searches file {:?}: {}", self.persistence_path, e);
                Vec::new()
            }
        };

        let mut entries = self.entries.write().await;
        *entries = loaded;
        entries.truncate(MAX_RECENT_SEARCHES);
        info!("📂 Loaded {} recent searches", entries.len());
    }

    pub async fn list(&self) -> Vec<String> {
        self.entries.read().await.clone()
    }

    /// Put `query` at the front. Blank queries are ignored.
    pub async fn add(&self, query: &str) -> PulseResult<()> {
        if query.trim().is_empty() {
            return Ok(());
        }

        {
            let mut entries = self.entries.write().await;
            entries.retain(|existing| existing != query);
            entries.insert(0, query.to_string());
            entries.truncate(MAX_RECENT_SEARCHES);
        }
        self.save().await
    }

    pub async fn remove(&self, query: &str) -> PulseResult<()> {
        {
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|existing| existing != query);
            if entries.len() == before {
                return Ok(());
            }
        }
        self.save().await
    }

    /// Forget everything, including the file on disk.
    pub async fn clear(&self) -> PulseResult<()> {
        self.entries.write().await.clear();

        match tokio::fs::remove_file(&self.persistence_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PulseError::PersistenceError(format!(
                "Failed to remove {:?}: {}",
                self.persistence_path, e
            ))),
        }
    }

    pub async fn save(&self) -> PulseResult<()> {
        if let Some(parent) = self.persistence_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = self.entries.read().await;
        let data = serde_json::to_string(&*entries)?;
        tokio::fs::write(&self.persistence_path, data)
            .await
            .map_err(|e| PulseError::PersistenceError(format!("Failed to write {:?}: {}", self.persistence_path, e)))?;

        debug!("💾 Saved {} recent searches", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{token, with_market};
    use crate::catalog::Catalog;
    use crate::models::Section;

    fn recent_in(dir: &tempfile::TempDir) -> RecentSearches {
        RecentSearches::with_path(dir.path().join("cache").join("recent.json"))
    }

    #[test]
    fn test_search_matches_any_field() {
        let tokens = Catalog::builtin().unwrap().tokens().to_vec();

        let by_symbol: Vec<String> = search_tokens(&tokens, "dking").into_iter().map(|t| t.name).collect();
        assert_eq!(by_symbol, vec!["DeFiKing".to_string()]);

        let by_tag = search_tokens(&tokens, "FROG");
        assert!(by_tag.iter().any(|t| t.name == "PepeRocket"));
        assert!(by_tag.iter().any(|t| t.name == "TurboFrog"));

        assert!(search_tokens(&tokens, "   ").is_empty());
    }

    #[test]
    fn test_search_is_capped() {
        let tokens: Vec<TokenRecord> = (0..15)
            .map(|i| token(&format!("Token{}", i), Section::NewPairs))
            .collect();
        let results = search_tokens(&tokens, "token");
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].name, "Token0");
    }

    #[test]
    fn test_popular_tokens() {
        let tokens: Vec<TokenRecord> = (0..8)
            .map(|i| with_market(token(&format!("Hot{}", i), Section::NewPairs), 0.1, 60.0, i as f64 * 100.0, 1))
            .chain(std::iter::once(with_market(
                token("Cold", Section::Migrated),
                0.1,
                50.0,
                1_000_000.0,
                1,
            )))
            .collect();

        let popular = popular_tokens(&tokens);
        let names: Vec<&str> = popular.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Hot7", "Hot6", "Hot5", "Hot4", "Hot3", "Hot2"]);
    }

    #[tokio::test]
    async fn test_recent_searches_order_and_cap() {
        let dir = tempfile::tempdir().unwrap();
        let recent = recent_in(&dir);

        for query in ["a", "b", "c", "d", "e", "f"] {
            recent.add(query).await.unwrap();
        }
        recent.add("d").await.unwrap();
        recent.add("  ").await.unwrap();

        assert_eq!(recent.list().await, vec!["d", "f", "e", "c", "b"]);

        recent.remove("e").await.unwrap();
        assert_eq!(recent.list().await, vec!["d", "f", "c", "b"]);

        // Survives a restart
        let reloaded = recent_in(&dir);
        reloaded.load().await;
        assert_eq!(reloaded.list().await, vec!["d", "f", "c", "b"]);
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let recent = recent_in(&dir);
        recent.add("moon").await.unwrap();
        assert!(recent.path().exists());

        recent.clear().await.unwrap();
        assert!(recent.list().await.is_empty());
        assert!(!recent.path().exists());
        recent.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let recent = RecentSearches::with_path(path);
        recent.load().await;
        assert!(recent.list().await.is_empty());

        let missing = RecentSearches::with_path(dir.path().join("missing.json"));
        missing.load().await;
        assert!(missing.list().await.is_empty());
    }
}
