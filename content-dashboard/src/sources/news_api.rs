use crate::fetcher::{describe_status, Fetcher};
use crate::normalizer::{ArticleNormalizer, RawArticle};
use crate::types::{Article, ArticleSource, PageCriteria, Result, SourceError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    total_results: Option<u64>,
    #[serde(default)]
    articles: Vec<RawArticle>,
    #[serde(default)]
    message: Option<String>,
}

/// Top headlines from a NewsAPI-compatible endpoint.
pub struct NewsApiSource {
    fetcher: Fetcher,
    base_url: String,
    api_key: Option<String>,
    default_country: Option<String>,
}

impl NewsApiSource {
    pub fn new(fetcher: Fetcher, base_url: &str, api_key: Option<String>) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_country: None,
        })
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.default_country = Some(country.into());
        self
    }

    pub fn request_url(&self, page: &PageCriteria) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/top-headlines", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(country) = page.country.as_ref().or(self.default_country.as_ref()) {
                query.append_pair("country", country);
            }
            if let Some(category) = &page.category {
                query.append_pair("category", category);
            }
            if let Some(q) = &page.query {
                query.append_pair("q", q);
            }
            query.append_pair("page", &page.page.max(1).to_string());
            query.append_pair("pageSize", &page.page_size.to_string());
        }
        Ok(url)
    }

    /// Turn a response into raw records or one error message. Never yields a
    /// partial list.
    pub fn interpret(status: StatusCode, body: &str) -> std::result::Result<Vec<RawArticle>, SourceError> {
        let parsed = serde_json::from_str::<NewsApiResponse>(body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|response| response.message)
                .unwrap_or_else(|| describe_status(status));
            return Err(SourceError::new(message));
        }

        let response = parsed
            .map_err(|e| SourceError::new(format!("Malformed response from article source: {}", e)))?;

        if response.status != "ok" {
            return Err(SourceError::new(response.message.unwrap_or_else(|| {
                format!("Article source returned status {}", response.status)
            })));
        }

        if let Some(total) = response.total_results {
            info!("Article source reports {} total results", total);
        }
        Ok(response.articles)
    }
}

#[async_trait]
impl ArticleSource for NewsApiSource {
    fn source_name(&self) -> String {
        format!("newsapi:{}", self.base_url)
    }

    async fn fetch(&self, page: &PageCriteria) -> std::result::Result<Vec<Article>, SourceError> {
        let url = self
            .request_url(page)
            .map_err(|e| SourceError::new(e.to_string()))?;

        let headers: Vec<(&str, &str)> = match &self.api_key {
            Some(key) => vec![("X-Api-Key", key.as_str())],
            None => Vec::new(),
        };

        let fetched = self.fetcher.get_text(url, &headers).await.map_err(|e| {
            warn!("Article fetch failed: {}", e);
            SourceError::new(e.to_string())
        })?;

        let raw = Self::interpret(fetched.status, &fetched.body)?;
        let articles = ArticleNormalizer::new().normalize_all(raw);

        info!("Fetched {} articles in {}ms", articles.len(), fetched.response_time_ms);
        Ok(articles)
    }
}
