use crate::normalizer::{ArticleNormalizer, RawArticle};
use crate::types::{Article, ArticleSource, PageCriteria, Result, SourceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
#[serde(untagged)]
enum MockFile {
    List(Vec<RawArticle>),
    Wrapped { articles: Vec<RawArticle> },
}

/// Serves articles from local mock data, paged like the live source.
pub struct MockArticleSource {
    name: String,
    records: Vec<RawArticle>,
}

impl MockArticleSource {
    pub fn from_records(records: Vec<RawArticle>) -> Self {
        Self {
            name: "mock".to_string(),
            records,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records = match serde_json::from_str::<MockFile>(json)? {
            MockFile::List(records) => records,
            MockFile::Wrapped { articles } => articles,
        };
        Ok(Self::from_records(records))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut source = Self::from_json(&json)?;
        source.name = format!("mock:{}", path.display());
        info!("Loaded {} mock article records from {}", source.records.len(), path.display());
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ArticleSource for MockArticleSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    async fn fetch(&self, page: &PageCriteria) -> std::result::Result<Vec<Article>, SourceError> {
        let size = page.page_size.max(1) as usize;
        let skip = (page.page.max(1) as usize - 1).saturating_mul(size);
        let window: Vec<RawArticle> = self.records.iter().skip(skip).take(size).cloned().collect();

        debug!("Serving mock page {} ({} records)", page.page, window.len());
        Ok(ArticleNormalizer::new().normalize_all(window))
    }
}
