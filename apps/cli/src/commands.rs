//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use blogsmith_core::{
    Orchestrator, ProgressReporter, RunReport, RunStatus, SilentProgress, Synthesizer,
    scrape_and_store,
};
use blogsmith_crawler::SiteCrawler;
use blogsmith_discovery::ReferenceFinder;
use blogsmith_shared::{
    AppConfig, ArticleId, ArticleRecord, BlogsmithError, CrawlConfig, GenerationOptions,
    PipelineOptions, SearchOptions, database_path, init_config, load_config,
};
use blogsmith_storage::Storage;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Blogsmith: scrape, enrich, and republish blog articles.
#[derive(Parser)]
#[command(
    name = "blogsmith",
    version,
    about = "Scrape blog articles, enrich them with web references, and publish enhanced rewrites.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress the progress spinner.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Database path (overrides the config file).
    #[arg(long, global = true, env = "BLOGSMITH_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the blog listing page and store new articles.
    Scrape {
        /// Listing page URL (defaults to `site.listing_url`).
        #[arg(long)]
        url: Option<String>,
    },

    /// Enhance every stored original with references and publish new versions.
    Enhance,

    /// List stored articles.
    List {
        /// Only original articles.
        #[arg(long, conflicts_with = "enhanced")]
        original: bool,

        /// Only enhanced articles.
        #[arg(long)]
        enhanced: bool,

        /// Page number (1-based).
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Articles per page.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Show one article.
    Show {
        /// Article ID.
        id: String,

        /// Print the full record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the enhanced versions of an original article.
    Versions {
        /// Original article ID.
        id: String,
    },

    /// Full-text search over titles and bodies.
    Search {
        /// FTS5 query.
        query: String,

        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Delete an article.
    Delete {
        /// Article ID.
        id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blogsmith=info",
        1 => "blogsmith=debug",
        _ => "blogsmith=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db.as_deref();
    match cli.command {
        Command::Scrape { url } => cmd_scrape(db, url.as_deref(), cli.quiet).await,
        Command::Enhance => cmd_enhance(db, cli.quiet).await,
        Command::List {
            original,
            enhanced,
            page,
            limit,
        } => cmd_list(db, ListFilter::from_flags(original, enhanced), page, limit).await,
        Command::Show { id, json } => cmd_show(db, &id, json).await,
        Command::Versions { id } => cmd_versions(db, &id).await,
        Command::Search { query, limit } => cmd_search(db, &query, limit).await,
        Command::Delete { id } => cmd_delete(db, &id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Resolve the database path from the `--db` flag or config.
fn resolve_db_path(db: Option<&Path>, config: &AppConfig) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(database_path(config)?),
    }
}

async fn open_storage(db: Option<&Path>, config: &AppConfig) -> Result<Storage> {
    let path = resolve_db_path(db, config)?;
    Storage::open(&path)
        .await
        .wrap_err_with(|| format!("failed to open database at {}", path.display()))
}

async fn open_storage_readonly(db: Option<&Path>, config: &AppConfig) -> Result<Storage> {
    let path = resolve_db_path(db, config)?;
    Storage::open_readonly(&path)
        .await
        .wrap_err("no article database yet; run `blogsmith scrape` first")
}

/// Spinner for interactive use, nothing with `--quiet`.
fn reporter(quiet: bool) -> Box<dyn ProgressReporter> {
    if quiet {
        Box::new(SilentProgress)
    } else {
        Box::new(CliProgress::new())
    }
}

fn parse_article_id(id: &str) -> Result<ArticleId> {
    id.parse()
        .map_err(|e| eyre!("invalid article id '{id}': {e}"))
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_scrape(db: Option<&Path>, url: Option<&str>, quiet: bool) -> Result<()> {
    let config = load_config()?;

    let listing_url = url.unwrap_or(&config.site.listing_url).to_string();
    Url::parse(&listing_url).map_err(|e| eyre!("invalid URL '{listing_url}': {e}"))?;

    let storage = open_storage(db, &config).await?;
    let crawler = SiteCrawler::new(CrawlConfig::from(&config))?;

    info!(url = %listing_url, max = config.site.max_articles, "scraping listing page");

    let progress = reporter(quiet);
    let result = scrape_and_store(&crawler, &storage, &listing_url, progress.as_ref()).await;
    drop(progress);
    let report = result?;

    println!();
    if report.placeholder {
        println!("  Listing page unreachable; stored built-in placeholder articles.");
    }
    println!("  Discovered: {}", report.discovered);
    println!("  Saved:      {}", report.saved);
    println!("  Existing:   {}", report.skipped_existing);
    println!("  Failed:     {}", report.failed);
    println!();

    Ok(())
}

async fn cmd_enhance(db: Option<&Path>, quiet: bool) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(db, &config).await?;

    let synthesizer = Synthesizer::new(GenerationOptions::from_env(&config))?;
    if !synthesizer.has_primary() {
        info!(
            env = %config.generation.api_key_env,
            "no API key set, using rule-based synthesis"
        );
    }

    let orchestrator = Orchestrator::new(
        &storage,
        ReferenceFinder::new(SearchOptions::from(&config))?,
        SiteCrawler::new(CrawlConfig::from(&config))?,
        synthesizer,
        PipelineOptions::from(&config),
    );

    let progress = reporter(quiet);
    let result = orchestrator.run(progress.as_ref()).await;
    drop(progress);
    let report = result?;

    print_run_report(&report);
    Ok(())
}

fn print_run_report(report: &RunReport) {
    println!();
    match report.status {
        RunStatus::NoOriginals => {
            println!("  No original articles found. Run `blogsmith scrape` first.");
            println!();
            return;
        }
        RunStatus::Completed => println!("  Enhancement complete!"),
        RunStatus::CompletedWithErrors => println!("  Enhancement finished with errors."),
    }
    println!("  Originals:  {}", report.originals_found);
    println!("  Published:  {}", report.published);
    println!("  Failed:     {}", report.failed);
    println!(
        "  Methods:    {} external-model, {} rule-based",
        report.external_model, report.rule_based
    );
    println!("  References: {}", report.references_used);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// Browsing commands
// ---------------------------------------------------------------------------

/// Which articles `list` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFilter {
    All,
    Original,
    Enhanced,
}

impl ListFilter {
    fn from_flags(original: bool, enhanced: bool) -> Self {
        match (original, enhanced) {
            (true, _) => Self::Original,
            (_, true) => Self::Enhanced,
            _ => Self::All,
        }
    }
}

async fn cmd_list(db: Option<&Path>, filter: ListFilter, page: u32, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(db, &config).await?;

    let page = page.max(1);
    let limit = limit.max(1);

    let (records, total) = match filter {
        ListFilter::All => (
            storage.list_articles(page, limit).await?,
            storage.count_articles().await? as usize,
        ),
        ListFilter::Original | ListFilter::Enhanced => {
            let all = if filter == ListFilter::Original {
                storage.list_originals().await?
            } else {
                storage.list_enhanced().await?
            };
            let total = all.len();
            let skip = (page - 1).saturating_mul(limit) as usize;
            (all.into_iter().skip(skip).take(limit as usize).collect(), total)
        }
    };

    if records.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    for record in &records {
        println!("{}", summary_line(record));
    }

    let pages = total.div_ceil(limit as usize).max(1);
    println!();
    println!("  Page {page} of {pages} ({total} articles)");
    Ok(())
}

/// One-line listing entry: id, kind, title.
fn summary_line(record: &ArticleRecord) -> String {
    let kind = if record.is_derived {
        format!("enhanced v{}", record.version)
    } else {
        "original".to_string()
    };
    format!("{}  {kind:<12}  {}", record.id, record.title)
}

async fn cmd_show(db: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(db, &config).await?;
    let id = parse_article_id(id)?;

    let record = storage
        .get_article(&id)
        .await?
        .ok_or_else(|| eyre!("no article with id {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("{}", record.title);
    println!();
    println!("  ID:      {}", record.id);
    println!("  URL:     {}", record.source_url);
    println!("  Author:  {}", record.author);
    println!("  Words:   {}", record.word_count);
    println!("  Created: {}", record.created_at.to_rfc3339());
    if let Some(original_id) = &record.original_id {
        println!("  Version: {} of original {original_id}", record.version);
    }
    if let Some(generation) = &record.generation {
        let model = generation.model.as_deref().unwrap_or("-");
        println!("  Method:  {} (model: {model})", generation.method);
    }
    if !record.references.is_empty() {
        println!("  References:");
        for reference in &record.references {
            println!("    - {} <{}>", reference.title, reference.source_url);
        }
    }
    println!();
    println!("{}", record.body);
    Ok(())
}

async fn cmd_versions(db: Option<&Path>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(db, &config).await?;
    let id = parse_article_id(id)?;

    let original = storage
        .get_article(&id)
        .await?
        .ok_or_else(|| eyre!("no article with id {id}"))?;
    if original.is_derived {
        return Err(eyre!("{id} is an enhanced article; pass the original's id"));
    }

    let versions = storage.list_versions(&id).await?;
    println!("{}", summary_line(&original));
    if versions.is_empty() {
        println!("  (no enhanced versions yet)");
    }
    for version in &versions {
        let method = version
            .generation
            .as_ref()
            .map(|g| g.method.as_str())
            .unwrap_or("-");
        println!(
            "  v{:<3} {}  {method:<14}  {} refs  {}",
            version.version,
            version.id,
            version.references.len(),
            version.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_search(db: Option<&Path>, query: &str, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(db, &config).await?;

    let results = storage.search(query, limit).await?;
    if results.is_empty() {
        println!("No matches for '{query}'.");
        return Ok(());
    }

    for result in &results {
        let kind = if result.is_derived { "enhanced" } else { "original" };
        println!("{}  {kind:<8}  {}", result.id, result.title);
    }
    Ok(())
}

async fn cmd_delete(db: Option<&Path>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(db, &config).await?;
    let id = parse_article_id(id)?;

    if storage.delete_article(&id).await? {
        info!(%id, "article deleted");
        println!("Deleted {id}");
        Ok(())
    } else {
        Err(eyre!("no article with id {id}"))
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article_started(&self, current: usize, total: usize, title: &str) {
        self.spinner
            .set_message(format!("Enhancing [{current}/{total}] {title}"));
    }

    fn article_published(&self, record: &ArticleRecord) {
        let method = record
            .generation
            .as_ref()
            .map(|g| g.method.as_str())
            .unwrap_or("-");
        self.spinner.println(format!(
            "  ✓ {} ({method}, {} refs)",
            record.title,
            record.references.len()
        ));
    }

    fn article_failed(&self, title: &str, error: &BlogsmithError) {
        self.spinner.println(format!("  ✗ {title}: {error}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
