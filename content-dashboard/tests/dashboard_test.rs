mod common;

use async_trait::async_trait;
use chrono::Utc;
use common::{ids, init_tracing, scenario_articles};
use content_dashboard::{
    AppwriteIdentityProvider, Article, ArticleSource, AuthService, BoundaryError, Dashboard,
    DashboardConfig, DashboardError, DashboardOptions, ExportFormat, FetchStatus, Fetcher,
    HttpConfig, IdentityProvider, Money, OAuthRedirect, OAuthRequest, PageCriteria, PayoutRates,
    PreferenceStore, RateCommand, RateInput, Result, Session, SourceError, StaticIdentityProvider,
    ThemePreference, UnknownAuthorPolicy, UserIdentity, DEFAULT_PAYOUT_RATE,
};
use interfaces::{BoundaryResult, EmptyArticleSource, FilePreferenceStore, MemoryPreferenceStore};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Hands out queued responses in order, then empty pages.
struct ScriptedSource {
    responses: Mutex<VecDeque<std::result::Result<Vec<Article>, SourceError>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<std::result::Result<Vec<Article>, SourceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl ArticleSource for ScriptedSource {
    fn source_name(&self) -> String {
        "scripted".to_string()
    }

    async fn fetch(&self, _page: &PageCriteria) -> std::result::Result<Vec<Article>, SourceError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[tokio::test]
async fn dashboard_refresh_filter_and_payout_flow() -> Result<()> {
    init_tracing();
    let preferences = Arc::new(MemoryPreferenceStore::new());
    let source = ScriptedSource::new(vec![
        Ok(scenario_articles()),
        Err(SourceError::new("HTTP 429: Too Many Requests")),
    ]);
    let mut dashboard = Dashboard::new(source, Arc::clone(&preferences), DashboardOptions::default())?;
    assert_eq!(dashboard.status(), &FetchStatus::Idle);
    assert!(dashboard.articles().is_empty());

    let status = dashboard.refresh(&PageCriteria::default()).await;
    assert_eq!(status, &FetchStatus::Idle);
    assert_eq!(dashboard.articles().len(), 3);
    assert_eq!(dashboard.author_options(), vec!["A", "B"]);

    dashboard.filters_mut().set_authors(["A"]);
    assert_eq!(ids(&dashboard.visible_articles()), vec!["1", "3"]);
    assert_eq!(dashboard.summary_in(&Utc).total_payout, Money::from_minor(200_00));

    dashboard.set_rate_override("A", RateInput::parse("150")?)?;
    let rows = dashboard.export_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_payout, Money::from_minor(300_00));

    let csv = dashboard.export(ExportFormat::Csv)?;
    let text = String::from_utf8(csv.bytes).unwrap();
    assert!(text.ends_with("A,2,150.00,300.00"));

    // Failure keeps what was already loaded.
    dashboard.refresh(&PageCriteria::default()).await;
    assert_eq!(dashboard.error(), Some("HTTP 429: Too Many Requests"));
    assert_eq!(dashboard.articles().len(), 3);

    dashboard.clear_filters();
    assert_eq!(dashboard.visible_articles().len(), 3);
    assert_eq!(dashboard.summary().per_author_count.total(), 3);

    let saved = PayoutRates::load(preferences.as_ref(), DEFAULT_PAYOUT_RATE)?;
    assert_eq!(saved.override_for("A"), Some(Money::from_minor(150_00)));

    info!("Dashboard flow finished with {} articles", dashboard.articles().len());
    Ok(())
}

#[tokio::test]
async fn manual_fetch_tickets_resolve_last_write_wins() -> Result<()> {
    let mut dashboard = Dashboard::new(
        EmptyArticleSource,
        MemoryPreferenceStore::new(),
        DashboardOptions::default(),
    )?;

    let first = dashboard.start_fetch();
    let second = dashboard.start_fetch();
    dashboard.finish_fetch(second, Ok(scenario_articles()));
    dashboard.finish_fetch(first, Err(SourceError::new("timed out")));

    assert_eq!(dashboard.status(), &FetchStatus::Error("timed out".to_string()));
    assert_eq!(dashboard.articles().len(), 3);
    Ok(())
}

#[tokio::test]
async fn saved_preferences_survive_a_new_dashboard() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("prefs.json");
    let options = DashboardOptions {
        default_rate: Money::from_minor(80_00),
        unknown_author_policy: UnknownAuthorPolicy::Exclude,
    };

    {
        let mut dashboard = Dashboard::new(
            EmptyArticleSource,
            interfaces::FilePreferenceStore::new(&path),
            options,
        )?;
        assert!(!dashboard.is_dark_mode());
        assert_eq!(dashboard.rates().default_rate(), Money::from_minor(80_00));
        assert!(dashboard.toggle_theme()?);
        dashboard.set_default_rate(RateInput::parse("90")?)?;
        dashboard.set_rate_override("B", RateInput::parse("10")?)?;
        assert_eq!(dashboard.clear_rate_override("missing")?, None);
    }

    let dashboard = Dashboard::new(
        EmptyArticleSource,
        interfaces::FilePreferenceStore::new(&path),
        options,
    )?;
    assert!(dashboard.is_dark_mode());
    assert_eq!(dashboard.rates().default_rate(), Money::from_minor(90_00));
    assert_eq!(dashboard.rates().override_for("B"), Some(Money::from_minor(10_00)));
    assert_eq!(dashboard.unknown_author_policy(), UnknownAuthorPolicy::Exclude);
    Ok(())
}

#[test]
fn theme_defaults_to_light_and_persists_each_toggle() -> Result<()> {
    let store = MemoryPreferenceStore::new();
    let mut theme = ThemePreference::load(&store)?;
    assert!(!theme.is_dark());

    assert!(theme.toggle(&store)?);
    assert_eq!(store.load("darkMode")?, Some("true".to_string()));
    assert!(!theme.toggle(&store)?);
    assert_eq!(store.load("darkMode")?, Some("false".to_string()));

    store.save("darkMode", "definitely")?;
    assert!(!ThemePreference::load(&store)?.is_dark());
    Ok(())
}

#[test]
fn unreadable_saved_rates_fall_back_to_default() -> Result<()> {
    let store = MemoryPreferenceStore::new();
    store.save("payoutRates", "{not json")?;

    let rates = PayoutRates::load(&store, Money::from_minor(42_00))?;

    assert_eq!(rates.default_rate(), Money::from_minor(42_00));
    assert!(rates.overrides().is_empty());
    Ok(())
}

#[test]
fn showing_rates_leaves_the_saved_value_alone() -> Result<()> {
    let store = MemoryPreferenceStore::new();
    store.save("payoutRates", "{not json")?;

    let shown = RateCommand::Show.run(&store, Money::from_minor(42_00))?;
    assert_eq!(shown.default_rate(), Money::from_minor(42_00));
    assert_eq!(store.load("payoutRates")?, Some("{not json".to_string()));

    let changed = RateCommand::Set {
        author: "A".to_string(),
        rate: RateInput::parse("0.125")?,
    }
    .run(&store, Money::from_minor(42_00))?;
    assert_eq!(changed.override_for("A"), Some(RateInput::parse("0.125")?));
    assert_eq!(
        PayoutRates::load(&store, DEFAULT_PAYOUT_RATE)?.override_for("A"),
        Some(RateInput::parse("0.125")?)
    );

    let cleared = RateCommand::Clear { author: "A".to_string() }.run(&store, DEFAULT_PAYOUT_RATE)?;
    assert!(cleared.overrides().is_empty());
    Ok(())
}

/// Reads from an in-memory store but refuses every write.
struct ReadOnlyStore {
    inner: MemoryPreferenceStore,
}

impl PreferenceStore for ReadOnlyStore {
    fn load(&self, key: &str) -> BoundaryResult<Option<String>> {
        self.inner.load(key)
    }

    fn save(&self, _key: &str, _value: &str) -> BoundaryResult<()> {
        Err(BoundaryError::Storage("disk full".to_string()))
    }
}

#[test]
fn rate_changes_that_fail_to_save_are_not_applied() -> Result<()> {
    let inner = MemoryPreferenceStore::new();
    let mut saved = PayoutRates::new(Money::from_minor(100_00));
    saved.set_override("A", Money::from_minor(150_00));
    saved.save(&inner)?;

    let mut dashboard = Dashboard::new(
        EmptyArticleSource,
        ReadOnlyStore { inner },
        DashboardOptions::default(),
    )?;
    let before = dashboard.rates().clone();

    assert!(dashboard.set_default_rate(Money::from_minor(5_00)).is_err());
    assert!(dashboard.set_rate_override("B", Money::from_minor(7_00)).is_err());
    assert!(matches!(
        dashboard.clear_rate_override("A"),
        Err(DashboardError::Boundary(BoundaryError::Storage(_)))
    ));
    assert_eq!(dashboard.rates(), &before);
    assert_eq!(dashboard.rates().override_for("A"), Some(Money::from_minor(150_00)));

    assert!(dashboard.toggle_theme().is_err());
    assert!(!dashboard.is_dark_mode());
    Ok(())
}

#[test]
fn corrupt_preference_file_starts_with_defaults() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "{\"darkMode\": tr")?;

    let options = DashboardOptions {
        default_rate: Money::from_minor(60_00),
        ..DashboardOptions::default()
    };
    let dashboard = Dashboard::new(EmptyArticleSource, FilePreferenceStore::new(&path), options)?;

    assert!(!dashboard.is_dark_mode());
    assert_eq!(dashboard.rates().default_rate(), Money::from_minor(60_00));
    assert!(dashboard.rates().overrides().is_empty());
    // The file is left for the user to repair.
    assert_eq!(std::fs::read_to_string(&path)?, "{\"darkMode\": tr");
    Ok(())
}

fn identity() -> StaticIdentityProvider {
    StaticIdentityProvider::new().with_account("editor@example.com", "correct horse", Some("Editor"))
}

#[tokio::test]
async fn login_failures_share_one_generic_error() -> Result<()> {
    init_tracing();
    let mut auth = AuthService::new(identity());

    let wrong_password = auth.login("editor@example.com", "battery staple").await.unwrap_err();
    let unknown_user = auth.login("nobody@example.com", "correct horse").await.unwrap_err();

    assert!(matches!(wrong_password, DashboardError::InvalidCredentials));
    assert!(matches!(unknown_user, DashboardError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert_eq!(wrong_password.to_string(), "Invalid credentials");
    assert!(!auth.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn login_restore_and_logout() -> Result<()> {
    let provider = Arc::new(identity());
    let mut auth = AuthService::new(Arc::clone(&provider));

    let signed_in = auth.login("Editor@Example.com", "correct horse").await?;
    assert_eq!(signed_in.user.email, "editor@example.com");
    assert_eq!(signed_in.user.name.as_deref(), Some("Editor"));
    assert_eq!(provider.session_count(), 1);

    // A second service over the same provider picks the session up.
    let mut restored = AuthService::new(Arc::clone(&provider));
    let current = restored.restore().await?.cloned();
    assert_eq!(current.as_ref(), auth.current());

    auth.logout().await?;
    assert!(!auth.is_authenticated());
    assert_eq!(provider.session_count(), 0);

    // Signing out twice is harmless.
    auth.logout().await?;
    // The restored service's session is gone on the provider side.
    restored.logout().await?;
    assert!(AuthService::new(Arc::clone(&provider)).restore().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn signup_creates_the_account_and_signs_in() -> Result<()> {
    init_tracing();
    let provider = Arc::new(identity());
    let mut auth = AuthService::new(Arc::clone(&provider));

    let signed_in = auth.signup("writer@example.com", "long enough", Some(" Writer ")).await?;
    assert_eq!(signed_in.user.email, "writer@example.com");
    assert_eq!(signed_in.user.name.as_deref(), Some("Writer"));
    assert_eq!(signed_in.session.user_id, signed_in.user.id);
    assert_eq!(provider.account_count(), 2);
    assert_eq!(provider.session_count(), 1);

    auth.logout().await?;
    let again = auth.login("Writer@Example.com", "long enough").await?;
    assert_eq!(again.user.email, "writer@example.com");
    Ok(())
}

#[tokio::test]
async fn signup_refuses_an_email_that_is_already_registered() -> Result<()> {
    let provider = Arc::new(identity());
    let mut auth = AuthService::new(Arc::clone(&provider));

    let taken = auth.signup("EDITOR@example.com", "something else", None).await.unwrap_err();
    match taken {
        DashboardError::AccountExists { email } => assert_eq!(email, "EDITOR@example.com"),
        other => panic!("unexpected error: {}", other),
    }

    let short = auth.signup("new@example.com", "short", None).await.unwrap_err();
    assert!(matches!(short, DashboardError::Boundary(BoundaryError::Rejected(_))));

    assert!(!auth.is_authenticated());
    assert_eq!(provider.account_count(), 1);
    assert_eq!(provider.session_count(), 0);

    // The original password still works.
    auth.login("editor@example.com", "correct horse").await?;
    Ok(())
}

/// Creates sessions fine but cannot fetch the signed-in user.
struct UserLookupFails {
    inner: StaticIdentityProvider,
    deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityProvider for UserLookupFails {
    async fn create_account(&self, email: &str, password: &str, name: Option<&str>) -> BoundaryResult<UserIdentity> {
        self.inner.create_account(email, password, name).await
    }

    async fn create_email_session(&self, email: &str, password: &str) -> BoundaryResult<Session> {
        self.inner.create_email_session(email, password).await
    }

    async fn get_session(&self, session_id: &str) -> BoundaryResult<Session> {
        self.inner.get_session(session_id).await
    }

    async fn get_current_user(&self) -> BoundaryResult<UserIdentity> {
        Err(BoundaryError::Transport("connection reset".to_string()))
    }

    async fn delete_session(&self, session_id: &str) -> BoundaryResult<()> {
        self.deleted.lock().unwrap().push(session_id.to_string());
        self.inner.delete_session(session_id).await
    }

    async fn create_oauth_session(&self, request: &OAuthRequest) -> BoundaryResult<OAuthRedirect> {
        self.inner.create_oauth_session(request).await
    }
}

#[tokio::test]
async fn login_drops_the_session_when_the_user_cannot_be_loaded() -> Result<()> {
    let provider = Arc::new(UserLookupFails {
        inner: identity(),
        deleted: Mutex::new(Vec::new()),
    });
    let mut auth = AuthService::new(Arc::clone(&provider));

    let err = auth.login("editor@example.com", "correct horse").await.unwrap_err();

    assert!(matches!(err, DashboardError::Boundary(BoundaryError::Transport(_))));
    assert!(!auth.is_authenticated());
    assert_eq!(provider.deleted.lock().unwrap().len(), 1);
    assert_eq!(provider.inner.session_count(), 0);
    Ok(())
}

fn oauth_request() -> OAuthRequest {
    OAuthRequest {
        provider: "github".to_string(),
        success_url: "http://localhost:5173/dashboard".to_string(),
        failure_url: "http://localhost:5173/login".to_string(),
        scopes: vec!["user:email".to_string(), "read:user".to_string()],
    }
}

#[tokio::test]
async fn static_provider_oauth_redirects_to_success() -> Result<()> {
    let auth = AuthService::new(identity());
    let redirect = auth.oauth_redirect(&oauth_request()).await?;
    assert_eq!(redirect.url, "http://localhost:5173/dashboard?provider=github");
    Ok(())
}

#[test]
fn appwrite_oauth_url_lists_project_and_scopes() -> Result<()> {
    let fetcher = Fetcher::new(HttpConfig::default())?;
    let provider = AppwriteIdentityProvider::new(fetcher, "https://cloud.appwrite.io/v1/", "sportdunia")?;

    let url = provider.oauth_url(&oauth_request())?;

    assert_eq!(url.path(), "/v1/account/sessions/oauth2/github");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let single: HashMap<&str, &str> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(single.get("project"), Some(&"sportdunia"));
    assert_eq!(single.get("success"), Some(&"http://localhost:5173/dashboard"));
    assert_eq!(single.get("failure"), Some(&"http://localhost:5173/login"));
    let scopes: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "scopes[]")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(scopes, vec!["user:email", "read:user"]);
    Ok(())
}

#[test]
fn appwrite_account_body_lets_the_server_pick_the_id() {
    let body = AppwriteIdentityProvider::account_body("writer@example.com", "long enough", Some("Writer"));
    assert_eq!(body["userId"], "unique()");
    assert_eq!(body["email"], "writer@example.com");
    assert_eq!(body["password"], "long enough");
    assert_eq!(body["name"], "Writer");

    let unnamed = AppwriteIdentityProvider::account_body("writer@example.com", "long enough", Some("  "));
    assert!(unnamed.get("name").is_none());
}

#[test]
fn default_config_builds_first_page_criteria() -> Result<()> {
    let config = DashboardConfig::default();
    let page = config.page_criteria();

    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 20);
    assert_eq!(page.country.as_deref(), Some("us"));
    assert_eq!(config.default_payout_rate, DEFAULT_PAYOUT_RATE);
    assert!(config.mock_articles_path.is_none());

    assert_eq!("Exclude".parse::<UnknownAuthorPolicy>()?, UnknownAuthorPolicy::Exclude);
    assert!(matches!(
        "sometimes".parse::<UnknownAuthorPolicy>(),
        Err(DashboardError::Config(_))
    ));
    Ok(())
}
