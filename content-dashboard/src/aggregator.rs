use crate::aggregators::TimeBucketAggregator;
use crate::types::{Article, ArticleCategory, DashboardError, Money};
use chrono::{Local, TimeZone};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;
use tracing::debug;

/// Group label for articles without an author.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Counter that remembers first-insertion order.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    entries: Vec<(K, u64)>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: K, n: u64) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += n,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, n));
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|(k, n)| (k, *n))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn to_vec(&self) -> Vec<(K, u64)> {
        self.entries.clone()
    }

    /// Entries reordered by a derived key; the tally itself is untouched.
    pub fn sorted_by_key<T, F>(&self, mut f: F) -> Vec<(K, u64)>
    where
        T: Ord,
        F: FnMut(&K) -> T,
    {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|(k, _)| f(k));
        entries
    }
}

impl<K: Eq + Hash + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq> PartialEq for Tally<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq> Eq for Tally<K> {}

impl<K: Display> Serialize for Tally<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(&key.to_string(), count)?;
        }
        map.end()
    }
}

/// Resolves the payout rate that applies to an author.
pub trait RateResolver {
    fn effective_rate(&self, author: &str) -> Money;
}

impl<F> RateResolver for F
where
    F: Fn(&str) -> Money,
{
    fn effective_rate(&self, author: &str) -> Money {
        self(author)
    }
}

/// Whether articles without an author get their own payout row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum UnknownAuthorPolicy {
    #[default]
    Include,
    Exclude,
}

impl FromStr for UnknownAuthorPolicy {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "include" => Ok(UnknownAuthorPolicy::Include),
            "exclude" => Ok(UnknownAuthorPolicy::Exclude),
            other => Err(DashboardError::Config(format!("unknown author policy: {}", other))),
        }
    }
}

/// Everything the summary tables and charts need for one filtered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub per_author_count: Tally<String>,
    pub per_author_payout: Vec<(String, Money)>,
    pub total_payout: Money,
    pub type_distribution: Tally<ArticleCategory>,
    pub time_series: Tally<String>,
    /// Rate used for each author, captured when this result was built.
    pub rates: BTreeMap<String, Money>,
}

impl AggregationResult {
    pub fn payout_for(&self, author: &str) -> Option<Money> {
        self.per_author_payout
            .iter()
            .find(|(name, _)| name == author)
            .map(|(_, amount)| *amount)
    }

    pub fn rate_for(&self, author: &str) -> Option<Money> {
        self.rates.get(author).copied()
    }
}

/// Aggregate with day buckets in the viewer's local timezone.
pub fn aggregate<'a, I, R>(articles: I, rates: &R, policy: UnknownAuthorPolicy) -> AggregationResult
where
    I: IntoIterator<Item = &'a Article>,
    R: RateResolver + ?Sized,
{
    aggregate_in(articles, rates, policy, &Local)
}

/// Aggregate with day buckets in `tz`.
pub fn aggregate_in<'a, I, R, Tz>(
    articles: I,
    rates: &R,
    policy: UnknownAuthorPolicy,
    tz: &Tz,
) -> AggregationResult
where
    I: IntoIterator<Item = &'a Article>,
    R: RateResolver + ?Sized,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut per_author_count = Tally::new();
    let mut type_distribution = Tally::new();
    let mut days = TimeBucketAggregator::daily(tz.clone());

    for article in articles {
        type_distribution.add(article.category());
        days.add_item(article);

        match article.author() {
            Some(author) => per_author_count.add(author.to_string()),
            None if policy == UnknownAuthorPolicy::Include => {
                per_author_count.add(UNKNOWN_AUTHOR.to_string())
            }
            None => {}
        }
    }

    let mut rates_used = BTreeMap::new();
    let per_author_payout: Vec<(String, Money)> = per_author_count
        .iter()
        .map(|(author, count)| {
            let rate = rates.effective_rate(author);
            rates_used.insert(author.clone(), rate);
            (author.clone(), rate.times(count))
        })
        .collect();
    let total_payout: Money = per_author_payout.iter().map(|(_, amount)| *amount).sum();

    let undated = days.skipped();
    let time_series = days.produce_output();

    debug!(
        "Aggregated {} authors, {} day buckets ({} undated), total payout {}",
        per_author_count.len(),
        time_series.len(),
        undated,
        total_payout
    );

    AggregationResult {
        per_author_count,
        per_author_payout,
        total_payout,
        type_distribution,
        time_series,
        rates: rates_used,
    }
}
