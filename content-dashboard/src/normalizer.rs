use crate::types::Article;
use crate::utils::{text::non_blank, url::article_id_from_url};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Placeholder NewsAPI returns for pulled articles.
const REMOVED_MARKER: &str = "[Removed]";

/// Any article shape a source may hand us.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawArticle {
    NewsApi(NewsApiArticle),
    Mock(MockArticle),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiArticle {
    pub source: NewsApiSourceRef,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsApiSourceRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Shape of the bundled mock data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockArticle {
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub section: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Maps raw source records into canonical articles, dropping unusable and
/// duplicate records.
pub struct ArticleNormalizer {
    seen_ids: HashSet<String>,
}

impl ArticleNormalizer {
    pub fn new() -> Self {
        Self {
            seen_ids: HashSet::new(),
        }
    }

    /// Normalize one batch. Order of surviving records is preserved.
    pub fn normalize_all(&mut self, raw: Vec<RawArticle>) -> Vec<Article> {
        let total = raw.len();
        let articles: Vec<Article> = raw
            .into_iter()
            .filter_map(|record| self.normalize(record))
            .collect();

        info!("Normalized {}/{} article records", articles.len(), total);
        articles
    }

    pub fn normalize(&mut self, raw: RawArticle) -> Option<Article> {
        let article = match raw {
            RawArticle::NewsApi(record) => Self::from_news_api(record),
            RawArticle::Mock(record) => Self::from_mock(record),
        }?;

        if !self.seen_ids.insert(article.id.clone()) {
            debug!("Skipping duplicate article with id: {}", article.id);
            return None;
        }
        Some(article)
    }

    fn from_news_api(record: NewsApiArticle) -> Option<Article> {
        let title = non_blank(record.title)?;
        if title == REMOVED_MARKER {
            debug!("Skipping removed article");
            return None;
        }

        let url = non_blank(record.url)?;
        let Some(id) = article_id_from_url(&url) else {
            warn!("Skipping article with invalid URL: {}", url);
            return None;
        };

        let source = non_blank(record.source.name)
            .or_else(|| non_blank(record.source.id))
            .unwrap_or_default();

        Some(Article {
            id,
            title,
            author: non_blank(record.author),
            description: non_blank(record.description),
            published_at: record.published_at.unwrap_or_default(),
            source,
            url,
            image_url: non_blank(record.url_to_image),
        })
    }

    fn from_mock(record: MockArticle) -> Option<Article> {
        let title = non_blank(record.title)?;
        let url = non_blank(record.url)?;
        if article_id_from_url(&url).is_none() {
            warn!("Skipping article with invalid URL: {}", url);
            return None;
        }

        let id = match non_blank(record.id) {
            Some(id) => id,
            None => article_id_from_url(&url)?,
        };

        // The mock `type` field is the category label; `section` is the fallback.
        let source = non_blank(record.kind)
            .or_else(|| non_blank(record.section))
            .unwrap_or_default();

        Some(Article {
            id,
            title,
            author: non_blank(record.author),
            description: non_blank(record.description),
            published_at: record.date.unwrap_or_default(),
            source,
            url,
            image_url: non_blank(record.image_url),
        })
    }
}

impl Default for ArticleNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
