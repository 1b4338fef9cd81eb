use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use content_dashboard::{
    aggregate, build_export_rows, filter_refs, AppwriteIdentityProvider, ArticleCategory,
    ArticleSource, AuthService, Dashboard, DashboardConfig, DashboardOptions, DateRange, Fetcher,
    MockArticleSource, NewsApiSource, OAuthRequest, PayoutRates, RateCommand, RateInput, UnknownAuthorPolicy,
};
use interfaces::{CsvExportWriter, ExportWriter, FilePreferenceStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-dashboard", about = "Article curation and contributor payout reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch articles, filter them and print the payout summary
    Report(ReportArgs),
    /// Show or toggle the saved dark-mode preference
    Theme {
        #[arg(long)]
        toggle: bool,
    },
    /// Manage saved payout rates
    Rates {
        #[command(subcommand)]
        action: RatesAction,
    },
    /// Create an email/password account and sign into it
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign in with email and password against the identity backend
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print the OAuth redirect URL for a provider
    OauthUrl {
        #[arg(long, default_value = "github")]
        provider: String,
        #[arg(long)]
        scope: Vec<String>,
    },
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long)]
    author: Vec<String>,
    #[arg(long = "type")]
    types: Vec<ArticleCategory>,
    /// Earliest publish date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    from: Option<String>,
    /// Latest publish date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    to: Option<String>,
    /// Per-author rate for this report only, as AUTHOR=AMOUNT
    #[arg(long = "rate")]
    rates: Vec<String>,
    #[arg(long)]
    default_rate: Option<String>,
    #[arg(long)]
    exclude_unknown: bool,
    /// Order the time series by date instead of first appearance
    #[arg(long)]
    chronological: bool,
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Also write the payout table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum RatesAction {
    Show,
    Set { author: String, amount: String },
    Clear { author: String },
    Default { amount: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::from_env().context("loading configuration")?;

    let result = match cli.command {
        Command::Report(args) => report(&config, args).await,
        Command::Theme { toggle } => theme(&config, toggle),
        Command::Rates { action } => rates(&config, action),
        Command::Signup { email, password, name } => signup(&config, &email, &password, name.as_deref()).await,
        Command::Login { email, password } => login(&config, &email, &password).await,
        Command::OauthUrl { provider, scope } => oauth_url(&config, provider, scope).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn article_source(config: &DashboardConfig) -> anyhow::Result<Arc<dyn ArticleSource>> {
    if let Some(path) = &config.mock_articles_path {
        return Ok(Arc::new(MockArticleSource::from_path(path)?));
    }
    let fetcher = Fetcher::new(config.http.clone())?;
    let source = NewsApiSource::new(fetcher, &config.news_api_base_url, config.news_api_key.clone())?
        .with_country(config.news_country.clone());
    Ok(Arc::new(source))
}

fn dashboard(config: &DashboardConfig) -> anyhow::Result<Dashboard<Arc<dyn ArticleSource>, FilePreferenceStore>> {
    let options = DashboardOptions {
        default_rate: config.default_payout_rate,
        unknown_author_policy: config.unknown_author_policy,
    };
    let preferences = FilePreferenceStore::new(&config.preferences_path);
    Ok(Dashboard::new(article_source(config)?, preferences, options)?)
}

async fn report(config: &DashboardConfig, args: ReportArgs) -> anyhow::Result<()> {
    let mut dashboard = dashboard(config)?;

    let mut page = config.page_criteria();
    page.page = args.page;
    dashboard.refresh(&page).await;
    if let Some(message) = dashboard.error() {
        bail!("could not load articles: {}", message);
    }

    let filters = dashboard.filters_mut();
    filters.set_search_query(args.search);
    filters.set_authors(args.author);
    filters.set_types(args.types);
    filters.set_date_range(DateRange::parse(args.from.as_deref(), args.to.as_deref())?);

    // Report-only rates; nothing here is saved.
    let mut rates: PayoutRates = dashboard.rates().clone();
    if let Some(raw) = &args.default_rate {
        rates.set_default_rate(RateInput::parse(raw)?);
    }
    for pair in &args.rates {
        let Some((author, amount)) = pair.rsplit_once('=') else {
            bail!("--rate expects AUTHOR=AMOUNT, got {:?}", pair);
        };
        rates.set_override(author.trim(), RateInput::parse(amount)?);
    }
    let policy = if args.exclude_unknown {
        UnknownAuthorPolicy::Exclude
    } else {
        dashboard.unknown_author_policy()
    };

    let articles = dashboard.articles();
    let visible = filter_refs(&articles, dashboard.filters());
    let summary = aggregate(visible.iter().copied(), &rates, policy);
    let rows = build_export_rows(&summary);

    let time_series = if args.chronological {
        summary
            .time_series
            .sorted_by_key(|label| NaiveDate::parse_from_str(label, "%m/%d/%Y").ok())
    } else {
        summary.time_series.to_vec()
    };

    let output = json!({
        "articles": articles.len(),
        "visible": visible.len(),
        "per_author_count": summary.per_author_count,
        "type_distribution": summary.type_distribution,
        "time_series": time_series,
        "total_payout": summary.total_payout,
        "total_payout_display": summary.total_payout.to_string(),
        "rows": rows,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(path) = args.csv {
        let artifact = CsvExportWriter::new().write(&rows)?;
        std::fs::write(&path, &artifact.bytes)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
    }
    Ok(())
}

fn theme(config: &DashboardConfig, toggle: bool) -> anyhow::Result<()> {
    let preferences = FilePreferenceStore::new(&config.preferences_path);
    let mut theme = content_dashboard::ThemePreference::load(&preferences)?;
    if toggle {
        theme.toggle(&preferences)?;
    }
    println!("{}", if theme.is_dark() { "dark" } else { "light" });
    Ok(())
}

fn rates(config: &DashboardConfig, action: RatesAction) -> anyhow::Result<()> {
    let preferences = FilePreferenceStore::new(&config.preferences_path);
    let command = match action {
        RatesAction::Show => RateCommand::Show,
        RatesAction::Set { author, amount } => RateCommand::Set {
            author,
            rate: RateInput::parse(&amount)?,
        },
        RatesAction::Clear { author } => RateCommand::Clear { author },
        RatesAction::Default { amount } => RateCommand::Default(RateInput::parse(&amount)?),
    };
    let rates = command.run(&preferences, config.default_payout_rate)?;

    println!("{}", serde_json::to_string_pretty(&rates)?);
    Ok(())
}

fn identity(config: &DashboardConfig) -> anyhow::Result<AuthService<AppwriteIdentityProvider>> {
    let fetcher = Fetcher::new(config.http.clone())?;
    let provider = AppwriteIdentityProvider::new(fetcher, &config.appwrite_endpoint, config.appwrite_project.clone())?;
    Ok(AuthService::new(provider))
}

async fn signup(config: &DashboardConfig, email: &str, password: &str, name: Option<&str>) -> anyhow::Result<()> {
    let mut auth = identity(config)?;
    let signed_in = auth.signup(email, password, name).await?;
    println!("{}", serde_json::to_string_pretty(&signed_in.user)?);
    Ok(())
}

async fn login(config: &DashboardConfig, email: &str, password: &str) -> anyhow::Result<()> {
    let mut auth = identity(config)?;
    let signed_in = auth.login(email, password).await?;
    println!("{}", serde_json::to_string_pretty(&signed_in.user)?);
    Ok(())
}

async fn oauth_url(config: &DashboardConfig, provider: String, scopes: Vec<String>) -> anyhow::Result<()> {
    let auth = identity(config)?;
    let redirect = auth
        .oauth_redirect(&OAuthRequest {
            provider,
            success_url: config.oauth_success_url.clone(),
            failure_url: config.oauth_failure_url.clone(),
            scopes,
        })
        .await?;
    println!("{}", redirect.url);
    Ok(())
}
