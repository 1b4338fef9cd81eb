mod common;

use common::{article, ids, init_tracing};
use content_dashboard::{
    ArticleNormalizer, ArticleSource, ArticleStore, FetchStatus, Fetcher, HttpConfig,
    MockArticleSource, NewsApiSource, PageCriteria, RawArticle, Result,
};
use reqwest::StatusCode;
use std::collections::HashMap;
use tracing::info;

const NEWS_API_BODY: &str = r#"{
    "status": "ok",
    "totalResults": 4,
    "articles": [
        {
            "source": { "id": "bbc-news", "name": "BBC News" },
            "author": "Jane Roe",
            "title": "Council approves budget",
            "description": "After a long session",
            "url": "https://www.bbc.co.uk/news/1",
            "urlToImage": "https://www.bbc.co.uk/img/1.jpg",
            "publishedAt": "2025-01-02T09:30:00Z",
            "content": "..."
        },
        {
            "source": { "id": null, "name": "[Removed]" },
            "author": null,
            "title": "[Removed]",
            "description": "[Removed]",
            "url": "https://removed.com",
            "urlToImage": null,
            "publishedAt": "1970-01-01T00:00:00Z",
            "content": "[Removed]"
        },
        {
            "source": { "id": "techcrunch", "name": "" },
            "author": "",
            "title": "Startup raises seed round",
            "description": null,
            "url": "https://techcrunch.com/2025/01/02/seed",
            "urlToImage": null,
            "publishedAt": "2025-01-02T11:00:00Z",
            "content": null
        },
        {
            "source": { "id": null, "name": "Broken Feed" },
            "author": "Nobody",
            "title": "Link is not a link",
            "description": null,
            "url": "not a url",
            "urlToImage": null,
            "publishedAt": "2025-01-02T11:00:00Z",
            "content": null
        }
    ]
}"#;

const MOCK_BODY: &str = r#"{
    "articles": [
        { "id": "m1", "title": "Match report", "author": "A", "date": "2025-01-01", "type": "News", "url": "https://sportdunia.test/m1" },
        { "id": "m2", "title": "Training diary", "author": "B", "date": "2025-01-02", "type": "Blog", "url": "https://sportdunia.test/m2" },
        { "id": "m3", "title": "Transfer rumours", "date": "2025-01-03", "section": "Sports News", "url": "https://sportdunia.test/m3" },
        { "id": "m1", "title": "Match report (copy)", "author": "A", "date": "2025-01-01", "type": "News", "url": "https://sportdunia.test/m1" },
        { "id": "m4", "author": "C", "date": "2025-01-04", "type": "Blog", "url": "https://sportdunia.test/m4" }
    ]
}"#;

#[test]
fn news_api_records_are_normalized() {
    init_tracing();
    let raw = NewsApiSource::interpret(StatusCode::OK, NEWS_API_BODY).unwrap();
    assert_eq!(raw.len(), 4);
    assert!(matches!(raw[0], RawArticle::NewsApi(_)));

    let articles = ArticleNormalizer::new().normalize_all(raw);

    assert_eq!(articles.len(), 2);
    let first = &articles[0];
    assert_eq!(first.id, "https://www.bbc.co.uk/news/1");
    assert_eq!(first.title, "Council approves budget");
    assert_eq!(first.author.as_deref(), Some("Jane Roe"));
    assert_eq!(first.source, "BBC News");
    assert_eq!(first.published_at, "2025-01-02T09:30:00Z");
    assert_eq!(first.image_url.as_deref(), Some("https://www.bbc.co.uk/img/1.jpg"));

    // Blank name falls back to the source id; blank author becomes None.
    let second = &articles[1];
    assert_eq!(second.source, "techcrunch");
    assert_eq!(second.author, None);
    assert_eq!(second.category().as_str(), "Blog");

    info!("Normalized {} NewsAPI articles", articles.len());
}

#[test]
fn mock_records_are_normalized_and_deduplicated() -> Result<()> {
    init_tracing();
    let source = MockArticleSource::from_json(MOCK_BODY)?;
    assert_eq!(source.len(), 5);

    let page = PageCriteria {
        page_size: 10,
        ..PageCriteria::default()
    };
    let articles = tokio_test::block_on(source.fetch(&page)).unwrap();

    assert_eq!(ids(&articles), vec!["m1", "m2", "m3"]);
    assert_eq!(articles[0].source, "News");
    assert_eq!(articles[0].published_at, "2025-01-01");
    assert_eq!(articles[2].source, "Sports News");
    assert_eq!(articles[2].author, None);
    assert_eq!(articles[2].category().as_str(), "News");
    Ok(())
}

#[tokio::test]
async fn mock_source_pages_through_its_records() -> Result<()> {
    let source = MockArticleSource::from_json(
        r#"[
            { "id": "1", "title": "One", "date": "2025-01-01", "type": "Blog", "url": "https://x.test/1" },
            { "id": "2", "title": "Two", "date": "2025-01-02", "type": "Blog", "url": "https://x.test/2" },
            { "id": "3", "title": "Three", "date": "2025-01-03", "type": "Blog", "url": "https://x.test/3" }
        ]"#,
    )?;

    let first = PageCriteria {
        page: 1,
        page_size: 2,
        ..PageCriteria::default()
    };
    let second = PageCriteria { page: 2, ..first.clone() };
    let third = PageCriteria { page: 3, ..first.clone() };

    assert_eq!(ids(&source.fetch(&first).await.unwrap()), vec!["1", "2"]);
    assert_eq!(ids(&source.fetch(&second).await.unwrap()), vec!["3"]);
    assert!(source.fetch(&third).await.unwrap().is_empty());
    Ok(())
}

#[test]
fn mock_source_reads_from_a_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("articles.json");
    std::fs::write(&path, MOCK_BODY)?;

    let source = MockArticleSource::from_path(&path)?;

    assert_eq!(source.len(), 5);
    assert!(source.source_name().starts_with("mock:"));
    assert!(MockArticleSource::from_path(dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn news_api_failures_become_a_single_message() {
    let rejected = NewsApiSource::interpret(
        StatusCode::UNAUTHORIZED,
        r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
    )
    .unwrap_err();
    assert_eq!(rejected.message, "Your API key is invalid.");

    let error_status = NewsApiSource::interpret(
        StatusCode::OK,
        r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#,
    )
    .unwrap_err();
    assert_eq!(error_status.message, "Too many requests");

    let html = NewsApiSource::interpret(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").unwrap_err();
    assert_eq!(html.message, "HTTP 500: Internal Server Error");

    let garbled = NewsApiSource::interpret(StatusCode::OK, "{\"status\":").unwrap_err();
    assert!(garbled.message.starts_with("Malformed response"));

    let empty = NewsApiSource::interpret(StatusCode::OK, r#"{"status":"ok","articles":[]}"#).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn news_api_request_url_carries_page_criteria() -> Result<()> {
    let fetcher = Fetcher::new(HttpConfig::default())?;
    let source = NewsApiSource::new(fetcher, "https://newsapi.test/v2/", Some("secret".to_string()))?
        .with_country("us");

    let url = source.request_url(&PageCriteria {
        page: 2,
        page_size: 10,
        country: None,
        category: Some("sports".to_string()),
        query: Some("cup final".to_string()),
    })?;

    assert_eq!(url.path(), "/v2/top-headlines");
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(query.get("country").map(String::as_str), Some("us"));
    assert_eq!(query.get("category").map(String::as_str), Some("sports"));
    assert_eq!(query.get("q").map(String::as_str), Some("cup final"));
    assert_eq!(query.get("page").map(String::as_str), Some("2"));
    assert_eq!(query.get("pageSize").map(String::as_str), Some("10"));
    assert!(!url.as_str().contains("secret"));

    assert!(NewsApiSource::new(Fetcher::new(HttpConfig::default())?, "not a url", None).is_err());
    Ok(())
}

#[test]
fn latest_resolution_wins_even_when_out_of_order() {
    init_tracing();
    let mut store = ArticleStore::new();
    let older = store.begin_fetch();
    let newer = store.begin_fetch();
    assert!(newer.seq() > older.seq());
    assert_eq!(store.in_flight(), 2);
    assert!(store.is_loading());

    store.resolve(newer, Ok(vec![article("new", Some("A"), "News", "2025-01-02")]));
    assert_eq!(store.in_flight(), 1);

    store.resolve(older, Ok(vec![article("old", Some("A"), "News", "2025-01-01")]));

    assert_eq!(ids(&store.articles()), vec!["old"]);
    assert_eq!(store.status(), &FetchStatus::Idle);
    assert_eq!(store.in_flight(), 0);
}

#[test]
fn failed_fetch_keeps_previous_articles() {
    let mut store = ArticleStore::with_articles(vec![
        article("1", Some("A"), "News", "2025-01-01"),
        article("2", Some("B"), "Blog", "2025-01-02"),
    ]);
    let held = store.articles();

    let ticket = store.begin_fetch();
    store.resolve(ticket, Err("HTTP 503: Service Unavailable".to_string()));

    assert!(!store.is_loading());
    assert_eq!(store.error(), Some("HTTP 503: Service Unavailable"));
    assert_eq!(ids(&store.articles()), vec!["1", "2"]);

    // A later success clears the error and swaps the collection.
    let ticket = store.begin_fetch();
    store.resolve(ticket, Ok(Vec::new()));
    assert_eq!(store.error(), None);
    assert!(store.articles().is_empty());
    assert_eq!(held.len(), 2);
}
