use crate::types::{Article, ArticleCategory, DashboardError, Result};
use crate::utils::{text::contains_ignore_case, time::parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Inclusive publish-time bounds. A missing bound is open on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Build from form input (`YYYY-MM-DD` or RFC 3339). Blank means unbounded.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Ok(Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a raw timestamp falls inside the range. When any bound is set,
    /// a timestamp that does not parse is outside.
    pub fn contains(&self, published_at: &str) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(published) = parse_timestamp(published_at) else {
            return false;
        };
        if let Some(start) = self.start {
            if published < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if published > end {
                return false;
            }
        }
        true
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| DashboardError::InvalidDate { input: s.to_string() }),
    }
}

/// Current filter selection. `Default` is "no restriction" on every dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search_query: String,
    pub authors: BTreeSet<String>,
    pub types: BTreeSet<ArticleCategory>,
    pub date_range: DateRange,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn set_authors<I, S>(&mut self, authors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
    }

    /// Add the author if absent, remove it if present.
    pub fn toggle_author(&mut self, author: &str) {
        if !self.authors.remove(author) {
            self.authors.insert(author.to_string());
        }
    }

    pub fn set_types<I>(&mut self, types: I)
    where
        I: IntoIterator<Item = ArticleCategory>,
    {
        self.types = types.into_iter().collect();
    }

    pub fn toggle_type(&mut self, category: ArticleCategory) {
        if !self.types.remove(&category) {
            self.types.insert(category);
        }
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = range;
    }

    pub fn set_date_start(&mut self, start: Option<&str>) -> Result<()> {
        self.date_range.start = parse_bound(start)?;
        Ok(())
    }

    pub fn set_date_end(&mut self, end: Option<&str>) -> Result<()> {
        self.date_range.end = parse_bound(end)?;
        Ok(())
    }

    /// Back to "no restriction" everywhere.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_unrestricted(&self) -> bool {
        self.search_query.is_empty()
            && self.authors.is_empty()
            && self.types.is_empty()
            && self.date_range.is_unbounded()
    }

    pub fn matches(&self, article: &Article) -> bool {
        Matcher::new(self).matches(article)
    }
}

/// Criteria with the search needle lowercased once per pass.
struct Matcher<'c> {
    criteria: &'c FilterCriteria,
    needle: Option<String>,
}

impl<'c> Matcher<'c> {
    fn new(criteria: &'c FilterCriteria) -> Self {
        let needle = if criteria.search_query.is_empty() {
            None
        } else {
            Some(criteria.search_query.to_lowercase())
        };
        Self { criteria, needle }
    }

    fn matches(&self, article: &Article) -> bool {
        self.matches_search(article)
            && self.matches_author(article)
            && self.matches_type(article)
            && self.criteria.date_range.contains(&article.published_at)
    }

    fn matches_search(&self, article: &Article) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        contains_ignore_case(&article.title, needle)
            || article
                .description
                .as_deref()
                .is_some_and(|d| contains_ignore_case(d, needle))
            || article
                .author
                .as_deref()
                .is_some_and(|a| contains_ignore_case(a, needle))
    }

    fn matches_author(&self, article: &Article) -> bool {
        if self.criteria.authors.is_empty() {
            return true;
        }
        article
            .author()
            .is_some_and(|author| self.criteria.authors.contains(author))
    }

    fn matches_type(&self, article: &Article) -> bool {
        self.criteria.types.is_empty() || self.criteria.types.contains(&article.category())
    }
}

/// Articles passing every active filter, in input order.
pub fn filter(articles: &[Article], criteria: &FilterCriteria) -> Vec<Article> {
    filter_refs(articles, criteria).into_iter().cloned().collect()
}

/// Borrowing form of [`filter`].
pub fn filter_refs<'a>(articles: &'a [Article], criteria: &FilterCriteria) -> Vec<&'a Article> {
    if criteria.is_unrestricted() {
        return articles.iter().collect();
    }

    let matcher = Matcher::new(criteria);
    let kept: Vec<&Article> = articles.iter().filter(|a| matcher.matches(a)).collect();

    debug!("Filter kept {}/{} articles", kept.len(), articles.len());
    kept
}

/// Distinct named authors in first-seen order, for the author picker.
pub fn unique_authors(articles: &[Article]) -> Vec<String> {
    let mut seen = HashSet::new();
    articles
        .iter()
        .filter_map(Article::author)
        .filter(|author| seen.insert(*author))
        .map(str::to_string)
        .collect()
}
