use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Canonical article record. Every source shape is normalized into this
/// before the filter and aggregation engines see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Raw ISO-8601 timestamp, parsed on demand.
    pub published_at: String,
    /// Source or category label used for classification.
    pub source: String,
    pub url: String,
    pub image_url: Option<String>,
}

impl Article {
    /// Author name, or `None` when absent or blank.
    pub fn author(&self) -> Option<&str> {
        self.author
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
    }

    pub fn category(&self) -> ArticleCategory {
        ArticleCategory::classify(&self.source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArticleCategory {
    News,
    Blog,
}

impl ArticleCategory {
    pub const ALL: [ArticleCategory; 2] = [ArticleCategory::News, ArticleCategory::Blog];

    /// The one classification rule: a label mentioning "news" is News,
    /// anything else is Blog.
    pub fn classify(label: &str) -> Self {
        if label.to_lowercase().contains("news") {
            ArticleCategory::News
        } else {
            ArticleCategory::Blog
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleCategory::News => "News",
            ArticleCategory::Blog => "Blog",
        }
    }
}

impl fmt::Display for ArticleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "news" => Ok(ArticleCategory::News),
            "blog" => Ok(ArticleCategory::Blog),
            other => Err(format!("unknown article type: {}", other)),
        }
    }
}

/// Non-negative currency amount. Arithmetic is exact decimal; amounts are
/// only rounded to cents when displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Amount given in minor units (1/100): `from_minor(1250)` is 12.50.
    pub const fn from_minor(minor: u64) -> Self {
        Money(Decimal::from_parts(minor as u32, (minor >> 32) as u32, 0, false, 2))
    }

    /// `None` for negative amounts.
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return None;
        }
        Some(Money(amount.abs()))
    }

    /// Parse a plain decimal such as `12.5` or `0.125`, keeping every digit.
    pub fn parse(raw: &str) -> Option<Self> {
        Decimal::from_str(raw.trim()).ok().and_then(Self::from_decimal)
    }

    /// Negative, NaN and infinite inputs are refused.
    pub fn from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        Self::parse(&amount.to_string())
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::MAX)
    }

    /// `self * count`, saturating.
    pub fn times(self, count: u64) -> Money {
        Money(self.0.checked_mul(Decimal::from(count)).unwrap_or(Decimal::MAX))
    }

    /// Nearest cent, halves away from zero.
    pub fn round_to_cents(self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Without grouping and with at least two decimals: `1234.50`, `0.125`.
    pub fn to_plain_string(self) -> String {
        let mut amount = self.0.normalize();
        if amount.scale() < 2 {
            amount.rescale(2);
        }
        amount.to_string()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

/// Thousands-separated, rounded to two decimals: `1,234.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cents = self.round_to_cents().0;
        cents.rescale(2);
        let text = cents.to_string();
        let (major, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(major.len() + major.len() / 3);
        for (i, digit) in major.chars().enumerate() {
            if i > 0 && (major.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }
        write!(f, "{}.{}", grouped, fraction)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match AmountRepr::deserialize(deserializer)? {
            AmountRepr::Number(amount) => Money::from_major(amount).ok_or_else(|| amount.to_string()),
            AmountRepr::Text(raw) => Money::parse(&raw).ok_or(raw),
        };
        parsed.map_err(|raw| serde::de::Error::custom(format!("invalid amount: {}", raw)))
    }
}

/// One line of the payout report handed to an export writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub author: String,
    pub article_count: u64,
    pub payout_rate: Money,
    pub total_payout: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    PdfTable,
    Spreadsheet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::PdfTable => "pdf",
            ExportFormat::Spreadsheet => "xlsx",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthRequest {
    pub provider: String,
    pub success_url: String,
    pub failure_url: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub url: String,
}

/// Which page of articles to ask a source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCriteria {
    pub page: u32,
    pub page_size: u32,
    pub country: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
}

impl Default for PageCriteria {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            country: None,
            category: None,
            query: None,
        }
    }
}

/// A failed article fetch, reduced to one user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundaryError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by provider: {0}")]
    Rejected(String),

    /// The resource already exists, e.g. an account for that email.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type BoundaryResult<T> = std::result::Result<T, BoundaryError>;

/// Hosted identity provider operations the dashboard consumes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new email/password account. Does not sign it in.
    async fn create_account(&self, email: &str, password: &str, name: Option<&str>) -> BoundaryResult<UserIdentity>;

    async fn create_email_session(&self, email: &str, password: &str) -> BoundaryResult<Session>;

    /// `session_id` may be `"current"`.
    async fn get_session(&self, session_id: &str) -> BoundaryResult<Session>;

    async fn get_current_user(&self) -> BoundaryResult<UserIdentity>;

    async fn delete_session(&self, session_id: &str) -> BoundaryResult<()>;

    async fn create_oauth_session(&self, request: &OAuthRequest) -> BoundaryResult<OAuthRedirect>;
}

/// Anything that can hand back a page of canonical articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    fn source_name(&self) -> String;

    async fn fetch(&self, page: &PageCriteria) -> Result<Vec<Article>, SourceError>;
}

pub trait ExportWriter {
    fn format(&self) -> ExportFormat;

    fn write(&self, rows: &[ExportRow]) -> BoundaryResult<ExportArtifact>;
}

/// String key/value persistence for client preferences.
pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> BoundaryResult<Option<String>>;

    fn save(&self, key: &str, value: &str) -> BoundaryResult<()>;
}

// Stores and sources are shared behind `Arc` by the composition root.
impl<T: PreferenceStore + ?Sized> PreferenceStore for std::sync::Arc<T> {
    fn load(&self, key: &str) -> BoundaryResult<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> BoundaryResult<()> {
        (**self).save(key, value)
    }
}

#[async_trait]
impl<T: ArticleSource + ?Sized> ArticleSource for std::sync::Arc<T> {
    fn source_name(&self) -> String {
        (**self).source_name()
    }

    async fn fetch(&self, page: &PageCriteria) -> Result<Vec<Article>, SourceError> {
        (**self).fetch(page).await
    }
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for std::sync::Arc<T> {
    async fn create_account(&self, email: &str, password: &str, name: Option<&str>) -> BoundaryResult<UserIdentity> {
        (**self).create_account(email, password, name).await
    }

    async fn create_email_session(&self, email: &str, password: &str) -> BoundaryResult<Session> {
        (**self).create_email_session(email, password).await
    }

    async fn get_session(&self, session_id: &str) -> BoundaryResult<Session> {
        (**self).get_session(session_id).await
    }

    async fn get_current_user(&self) -> BoundaryResult<UserIdentity> {
        (**self).get_current_user().await
    }

    async fn delete_session(&self, session_id: &str) -> BoundaryResult<()> {
        (**self).delete_session(session_id).await
    }

    async fn create_oauth_session(&self, request: &OAuthRequest) -> BoundaryResult<OAuthRedirect> {
        (**self).create_oauth_session(request).await
    }
}
