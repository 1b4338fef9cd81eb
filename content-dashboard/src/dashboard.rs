use crate::aggregator::{aggregate, aggregate_in, AggregationResult, UnknownAuthorPolicy};
use crate::export::{build_export_rows, ExportRegistry};
use crate::filter::{filter, filter_refs, unique_authors, FilterCriteria};
use crate::payout::{PayoutRates, DEFAULT_PAYOUT_RATE};
use crate::state::{ArticleStore, FetchTicket};
use crate::theme::ThemePreference;
use crate::types::{
    Article, ArticleSource, ExportArtifact, ExportFormat, ExportRow, FetchStatus, Money,
    PageCriteria, PreferenceStore, Result, SourceError,
};
use chrono::TimeZone;
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    /// Default rate used when nothing is saved yet.
    pub default_rate: Money,
    pub unknown_author_policy: UnknownAuthorPolicy,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            default_rate: DEFAULT_PAYOUT_RATE,
            unknown_author_policy: UnknownAuthorPolicy::default(),
        }
    }
}

/// Owns the dashboard state and the collaborators it was built with.
pub struct Dashboard<S, P> {
    source: S,
    preferences: P,
    articles: ArticleStore,
    filters: FilterCriteria,
    rates: PayoutRates,
    theme: ThemePreference,
    policy: UnknownAuthorPolicy,
    exports: ExportRegistry,
}

impl<S: ArticleSource, P: PreferenceStore> Dashboard<S, P> {
    /// Build a dashboard, loading saved rates and theme from `preferences`.
    pub fn new(source: S, preferences: P, options: DashboardOptions) -> Result<Self> {
        let rates = PayoutRates::load(&preferences, options.default_rate)?;
        let theme = ThemePreference::load(&preferences)?;

        info!(
            "Dashboard ready (source: {}, default rate: {}, dark mode: {})",
            source.source_name(),
            rates.default_rate(),
            theme.is_dark()
        );

        Ok(Self {
            source,
            preferences,
            articles: ArticleStore::new(),
            filters: FilterCriteria::default(),
            rates,
            theme,
            policy: options.unknown_author_policy,
            exports: ExportRegistry::default(),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch a page and make it the current collection. On failure the
    /// previous articles stay and the error is recorded in the status.
    pub async fn refresh(&mut self, page: &PageCriteria) -> &FetchStatus {
        let ticket = self.start_fetch();
        let outcome = self.source.fetch(page).await;
        self.finish_fetch(ticket, outcome);
        self.articles.status()
    }

    /// First half of [`Dashboard::refresh`] for callers that drive the fetch
    /// themselves.
    pub fn start_fetch(&mut self) -> FetchTicket {
        self.articles.begin_fetch()
    }

    pub fn finish_fetch(&mut self, ticket: FetchTicket, outcome: std::result::Result<Vec<Article>, SourceError>) {
        self.articles.resolve(ticket, outcome.map_err(|e| e.message));
    }

    pub fn articles(&self) -> Arc<[Article]> {
        self.articles.articles()
    }

    pub fn status(&self) -> &FetchStatus {
        self.articles.status()
    }

    /// Message of the last failed fetch, if the latest one failed.
    pub fn error(&self) -> Option<&str> {
        self.articles.error()
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterCriteria {
        &mut self.filters
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn visible_articles(&self) -> Vec<Article> {
        filter(&self.articles.articles(), &self.filters)
    }

    /// Authors offered by the author filter, drawn from the whole collection.
    pub fn author_options(&self) -> Vec<String> {
        unique_authors(&self.articles.articles())
    }

    pub fn summary(&self) -> AggregationResult {
        let articles = self.articles.articles();
        aggregate(filter_refs(&articles, &self.filters), &self.rates, self.policy)
    }

    /// [`Dashboard::summary`] with day buckets in `tz`.
    pub fn summary_in<Tz>(&self, tz: &Tz) -> AggregationResult
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let articles = self.articles.articles();
        aggregate_in(filter_refs(&articles, &self.filters), &self.rates, self.policy, tz)
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        build_export_rows(&self.summary())
    }

    pub fn export(&self, format: ExportFormat) -> Result<ExportArtifact> {
        self.exports.export(format, &self.export_rows())
    }

    pub fn exports_mut(&mut self) -> &mut ExportRegistry {
        &mut self.exports
    }

    pub fn rates(&self) -> &PayoutRates {
        &self.rates
    }

    pub fn set_default_rate(&mut self, rate: Money) -> Result<()> {
        self.update_rates(|rates| rates.set_default_rate(rate))
    }

    pub fn set_rate_override(&mut self, author: &str, rate: Money) -> Result<()> {
        self.update_rates(|rates| rates.set_override(author, rate))
    }

    pub fn clear_rate_override(&mut self, author: &str) -> Result<Option<Money>> {
        self.update_rates(|rates| rates.clear_override(author))
    }

    /// Apply `change` to a copy of the rates and keep it only once saved.
    fn update_rates<T>(&mut self, change: impl FnOnce(&mut PayoutRates) -> T) -> Result<T> {
        let mut next = self.rates.clone();
        let outcome = change(&mut next);
        next.save(&self.preferences)?;
        self.rates = next;
        Ok(outcome)
    }

    pub fn unknown_author_policy(&self) -> UnknownAuthorPolicy {
        self.policy
    }

    pub fn set_unknown_author_policy(&mut self, policy: UnknownAuthorPolicy) {
        self.policy = policy;
    }

    pub fn is_dark_mode(&self) -> bool {
        self.theme.is_dark()
    }

    pub fn toggle_theme(&mut self) -> Result<bool> {
        self.theme.toggle(&self.preferences)
    }
}
