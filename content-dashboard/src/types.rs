pub use interfaces::defs::{
    Article, ArticleCategory, ArticleSource, BoundaryError, ExportArtifact, ExportFormat,
    ExportRow, ExportWriter, IdentityProvider, Money, OAuthRedirect, OAuthRequest, PageCriteria,
    PreferenceStore, Session, SourceError, UserIdentity,
};

/// HTTP settings shared by the news source and the identity adapter.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Content-Dashboard/1.0".to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
        }
    }
}

/// Lifecycle of the most recent article fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error("Article source error: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid payout rate: {input}")]
    InvalidRate { input: String },

    #[error("Invalid date: {input}")]
    InvalidDate { input: String },

    /// Same message whether the account or the password was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("An account already exists for {email}")]
    AccountExists { email: String },

    #[error("Export format not supported: {0:?}")]
    UnsupportedExport(ExportFormat),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
