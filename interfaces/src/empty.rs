use crate::defs::Article;
use crate::defs::ArticleSource;
use crate::defs::BoundaryError;
use crate::defs::BoundaryResult;
use crate::defs::PageCriteria;
use crate::defs::PreferenceStore;
use crate::defs::SourceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct EmptyArticleSource;

#[async_trait]
impl ArticleSource for EmptyArticleSource {
    fn source_name(&self) -> String {
        "empty".to_owned()
    }

    async fn fetch(&self, _page: &PageCriteria) -> Result<Vec<Article>, SourceError> {
        // Nothing to curate.
        Ok(vec![])
    }
}

/// Preferences that live only as long as the process.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self, key: &str) -> BoundaryResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> BoundaryResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
