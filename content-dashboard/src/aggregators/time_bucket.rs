use crate::aggregator::Tally;
use crate::types::Article;
use crate::utils::time::{day_label, parse_timestamp};
use chrono::TimeZone;
use std::fmt::Display;
use tracing::debug;

/// Counts articles per calendar day in a given timezone.
///
/// Only days that received an article get a bucket, and buckets keep the
/// order in which their day was first seen.
pub struct TimeBucketAggregator<Tz: TimeZone> {
    tz: Tz,
    buckets: Tally<String>,
    skipped: usize,
}

impl<Tz> TimeBucketAggregator<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn daily(tz: Tz) -> Self {
        Self {
            tz,
            buckets: Tally::new(),
            skipped: 0,
        }
    }

    /// Returns false when the article's timestamp does not parse; such
    /// articles are left out of the series.
    pub fn add_item(&mut self, article: &Article) -> bool {
        match parse_timestamp(&article.published_at) {
            Some(instant) => {
                self.buckets.add(day_label(&instant, &self.tz));
                true
            }
            None => {
                debug!("No day bucket for article {} (published_at {:?})", article.id, article.published_at);
                self.skipped += 1;
                false
            }
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn produce_output(self) -> Tally<String> {
        self.buckets
    }
}
