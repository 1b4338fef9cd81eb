pub mod types;
pub mod config;
pub mod utils;
pub mod fetcher;
pub mod normalizer;
pub mod sources;
pub mod state;
pub mod filter;
pub mod aggregator;
pub mod aggregators;
pub mod payout;
pub mod export;
pub mod theme;
pub mod auth;
pub mod appwrite;
pub mod dashboard;

pub use types::*;
pub use config::DashboardConfig;
pub use fetcher::Fetcher;
pub use normalizer::{ArticleNormalizer, RawArticle};
pub use sources::{MockArticleSource, NewsApiSource};
pub use state::{ArticleStore, FetchTicket};
pub use filter::{filter, filter_refs, unique_authors, DateRange, FilterCriteria};
pub use aggregator::{aggregate, aggregate_in, AggregationResult, RateResolver, Tally, UnknownAuthorPolicy, UNKNOWN_AUTHOR};
pub use aggregators::TimeBucketAggregator;
pub use payout::{PayoutRates, RateCommand, RateInput, DEFAULT_PAYOUT_RATE};
pub use export::{build_export_rows, ExportRegistry};
pub use theme::ThemePreference;
pub use auth::{AuthService, AuthenticatedUser, StaticIdentityProvider};
pub use appwrite::AppwriteIdentityProvider;
pub use dashboard::{Dashboard, DashboardOptions};
