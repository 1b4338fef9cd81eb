use crate::aggregator::UnknownAuthorPolicy;
use crate::appwrite;
use crate::payout::{RateInput, DEFAULT_PAYOUT_RATE};
use crate::sources::news_api;
use crate::types::{DashboardError, HttpConfig, Money, PageCriteria, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub http: HttpConfig,

    pub news_api_base_url: String,
    pub news_api_key: Option<String>,
    pub news_country: String,
    pub news_page_size: u32,
    /// When set, articles come from this mock JSON file instead of the news API.
    pub mock_articles_path: Option<PathBuf>,

    pub appwrite_endpoint: String,
    pub appwrite_project: String,
    pub oauth_success_url: String,
    pub oauth_failure_url: String,

    pub default_payout_rate: Money,
    pub unknown_author_policy: UnknownAuthorPolicy,
    pub preferences_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            news_api_base_url: news_api::DEFAULT_BASE_URL.to_string(),
            news_api_key: None,
            news_country: "us".to_string(),
            news_page_size: 20,
            mock_articles_path: None,
            appwrite_endpoint: appwrite::DEFAULT_ENDPOINT.to_string(),
            appwrite_project: "sportdunia".to_string(),
            oauth_success_url: "http://localhost:5173/dashboard".to_string(),
            oauth_failure_url: "http://localhost:5173/login".to_string(),
            default_payout_rate: DEFAULT_PAYOUT_RATE,
            unknown_author_policy: UnknownAuthorPolicy::default(),
            preferences_path: PathBuf::from(".dashboard-preferences.json"),
        }
    }
}

impl DashboardConfig {
    /// Defaults, overridden by `.env` and then the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(v) = var("HTTP_TIMEOUT_SECONDS") {
            config.http.timeout_seconds = parse("HTTP_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = var("USER_AGENT") {
            config.http.user_agent = v;
        }

        if let Some(v) = var("NEWS_API_BASE_URL") {
            config.news_api_base_url = v;
        }
        config.news_api_key = var("NEWS_API_KEY");
        if let Some(v) = var("NEWS_COUNTRY") {
            config.news_country = v;
        }
        if let Some(v) = var("NEWS_PAGE_SIZE") {
            config.news_page_size = parse("NEWS_PAGE_SIZE", &v)?;
        }
        config.mock_articles_path = var("MOCK_ARTICLES_PATH").map(PathBuf::from);

        if let Some(v) = var("APPWRITE_ENDPOINT") {
            config.appwrite_endpoint = v;
        }
        if let Some(v) = var("APPWRITE_PROJECT") {
            config.appwrite_project = v;
        }
        if let Some(v) = var("OAUTH_SUCCESS_URL") {
            config.oauth_success_url = v;
        }
        if let Some(v) = var("OAUTH_FAILURE_URL") {
            config.oauth_failure_url = v;
        }

        if let Some(v) = var("DEFAULT_PAYOUT_RATE") {
            config.default_payout_rate = RateInput::parse(&v)
                .map_err(|_| DashboardError::Config(format!("DEFAULT_PAYOUT_RATE: invalid rate {:?}", v)))?;
        }
        if let Some(v) = var("UNKNOWN_AUTHOR_POLICY") {
            config.unknown_author_policy = v.parse()?;
        }
        if let Some(v) = var("PREFERENCES_PATH") {
            config.preferences_path = PathBuf::from(v);
        }

        debug!("Loaded configuration: {:?}", config.redacted());
        Ok(config)
    }

    /// First page with the configured country and size.
    pub fn page_criteria(&self) -> PageCriteria {
        PageCriteria {
            country: Some(self.news_country.clone()),
            page_size: self.news_page_size,
            ..PageCriteria::default()
        }
    }

    fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.news_api_key.is_some() {
            shown.news_api_key = Some("***".to_string());
        }
        shown
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| DashboardError::Config(format!("{}: cannot parse {:?}", name, raw)))
}
