//! Token Catalog
//!
//! The fixed, ordered list of tokens the dashboard monitors. Loaded once at
//! startup, either from a JSON file or from the built-in fixture, and never
//! mutated afterwards.

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PulseError, PulseResult};
use crate::models::{Section, TokenRecord};

const BUILTIN_CATALOG: &str = include_str!("../data/tokens.json");

#[derive(Debug, Clone)]
pub struct Catalog {
    tokens: Vec<TokenRecord>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate token names.
    pub fn from_records(tokens: Vec<TokenRecord>) -> PulseResult<Self> {
        let mut seen = HashSet::with_capacity(tokens.len());
        for token in &tokens {
            if !seen.insert(token.name.as_str()) {
                return Err(PulseError::DuplicateToken(token.name.clone()));
            }
        }
        Ok(Self { tokens })
    }

    pub fn from_json(data: &str) -> PulseResult<Self> {
        let tokens: Vec<TokenRecord> = serde_json::from_str(data)
            .map_err(|e| PulseError::CatalogError(format!("Failed to parse catalog: {}", e)))?;
        Self::from_records(tokens)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> PulseResult<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Load a catalog from a JSON file.
    pub async fn load(path: &Path) -> PulseResult<Self> {
        info!("Loading token catalog from {:?}", path);

        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PulseError::CatalogError(format!("Failed to read {:?}: {}", path, e)))?;

        if data.trim().is_empty() {
            return Err(PulseError::CatalogError(format!("Catalog file {:?} is empty", path)));
        }

        let catalog = Self::from_json(&data)?;
        debug!("Loaded {} tokens from catalog", catalog.len());
        Ok(catalog)
    }

    pub fn tokens(&self) -> &[TokenRecord] {
        &self.tokens
    }

    pub fn names(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TokenRecord> {
        self.tokens.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn section_len(&self, section: Section) -> usize {
        self.tokens.iter().filter(|t| t.section == section).count()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::token;
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 18);
        assert!(catalog.contains("MoonDoge"));
        assert!(catalog.contains("DeFiKing"));
        for section in Section::ALL {
            assert_eq!(catalog.section_len(section), 6);
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Catalog::from_records(vec![
            token("Alpha", Section::NewPairs),
            token("Alpha", Section::Migrated),
        ]);
        assert!(matches!(result, Err(PulseError::DuplicateToken(name)) if name == "Alpha"));
    }

    #[test]
    fn test_malformed_json_is_catalog_error() {
        let result = Catalog::from_json("[{\"name\": 1}]");
        assert!(matches!(result, Err(PulseError::CatalogError(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let records = vec![token("Alpha", Section::NewPairs), token("Beta", Section::Migrated)];
        tokio::fs::write(&path, serde_json::to_string(&records).unwrap()).await.unwrap();

        let catalog = Catalog::load(&path).await.unwrap();
        assert_eq!(catalog.names(), vec!["Alpha".to_string(), "Beta".to_string()]);
        assert_eq!(catalog.get("Beta").unwrap().section, Section::Migrated);
    }

    #[test]
    fn test_load_missing_or_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = tokio_test::block_on(Catalog::load(&dir.path().join("missing.json")));
        assert!(matches!(missing, Err(PulseError::CatalogError(_))));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "  \n").unwrap();
        let result = tokio_test::block_on(Catalog::load(&empty));
        assert!(matches!(result, Err(PulseError::CatalogError(_))));
    }
}
