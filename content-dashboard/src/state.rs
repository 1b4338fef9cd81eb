use crate::types::{Article, FetchStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle for one in-flight fetch. Resolving it updates the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Holds the current article collection and the status of the latest fetch.
///
/// The collection is swapped wholesale on each successful fetch; readers
/// holding the previous `Arc` keep seeing the old value.
#[derive(Debug)]
pub struct ArticleStore {
    articles: Arc<[Article]>,
    status: FetchStatus,
    next_seq: u64,
    last_resolved_seq: Option<u64>,
    in_flight: usize,
}

impl Default for ArticleStore {
    fn default() -> Self {
        Self {
            articles: Arc::from(Vec::new()),
            status: FetchStatus::Idle,
            next_seq: 0,
            last_resolved_seq: None,
            in_flight: 0,
        }
    }
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: articles.into(),
            ..Self::default()
        }
    }

    pub fn articles(&self) -> Arc<[Article]> {
        Arc::clone(&self.articles)
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Mark a fetch as started. Earlier fetches are not cancelled.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.next_seq += 1;
        self.in_flight += 1;
        self.status = FetchStatus::Loading;
        debug!("Fetch #{} started ({} in flight)", self.next_seq, self.in_flight);
        FetchTicket { seq: self.next_seq }
    }

    /// Apply a fetch outcome. Whichever resolution arrives last wins, even if
    /// it belongs to an older ticket. A failure keeps the previous articles.
    pub fn resolve(&mut self, ticket: FetchTicket, outcome: Result<Vec<Article>, String>) {
        self.in_flight = self.in_flight.saturating_sub(1);

        if let Some(last) = self.last_resolved_seq {
            if ticket.seq < last {
                debug!("Fetch #{} resolved after newer fetch #{}", ticket.seq, last);
            }
        }
        self.last_resolved_seq = Some(ticket.seq);

        match outcome {
            Ok(articles) => {
                info!("Fetch #{} loaded {} articles", ticket.seq, articles.len());
                self.articles = articles.into();
                self.status = FetchStatus::Idle;
            }
            Err(message) => {
                warn!("Fetch #{} failed: {}", ticket.seq, message);
                self.status = FetchStatus::Error(message);
            }
        }
    }
}
