#![allow(dead_code)]

use content_dashboard::Article;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn article(id: &str, author: Option<&str>, source: &str, published_at: &str) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Article {}", id),
        author: author.map(str::to_string),
        description: None,
        published_at: published_at.to_string(),
        source: source.to_string(),
        url: format!("https://example.com/articles/{}", id),
        image_url: None,
    }
}

/// A on News day 1, B on Blog day 2, A on Blog day 3.
pub fn scenario_articles() -> Vec<Article> {
    vec![
        article("1", Some("A"), "News", "2025-01-01"),
        article("2", Some("B"), "Blog", "2025-01-02"),
        article("3", Some("A"), "Blog", "2025-01-03"),
    ]
}

pub fn ids(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.id.as_str()).collect()
}
