//! End-to-end workflows: listing → originals, and originals → enhanced versions.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use blogsmith_crawler::SiteCrawler;
use blogsmith_discovery::ReferenceFinder;
use blogsmith_shared::{
    ArticleRecord, BlogsmithError, DERIVED_TITLE_SUFFIX, EXCERPT_CHARS, EnhancedDocument,
    GenerationMeta, GenerationMethod, PipelineOptions, ReferenceDocument, Result, truncate_chars,
    word_count,
};

use crate::store::ArticleStore;
use crate::synthesis::{ExternalModelStrategy, Synthesis, SynthesisStrategy, Synthesizer};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an article is processed.
    fn article_started(&self, current: usize, total: usize, title: &str);
    /// Called after a derived record is published.
    fn article_published(&self, record: &ArticleRecord);
    /// Called when an article could not be published.
    fn article_failed(&self, title: &str, error: &BlogsmithError);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article_started(&self, _current: usize, _total: usize, _title: &str) {}
    fn article_published(&self, _record: &ArticleRecord) {}
    fn article_failed(&self, _title: &str, _error: &BlogsmithError) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Overall outcome of an enhancement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Storage held no originals; nothing was attempted.
    NoOriginals,
    /// Every original produced a published derived record.
    Completed,
    /// At least one original failed to publish.
    CompletedWithErrors,
}

/// Result of [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    pub originals_found: usize,
    pub published: usize,
    pub failed: usize,
    pub rule_based: usize,
    pub external_model: usize,
    /// References embedded across all published records.
    pub references_used: usize,
    pub elapsed: Duration,
}

/// Result of [`scrape_and_store`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    /// Documents the crawler produced (placeholders included).
    pub discovered: usize,
    pub saved: usize,
    /// Documents whose source URL was already stored.
    pub skipped_existing: usize,
    /// Crawl failures plus storage failures.
    pub failed: usize,
    /// True when the listing was unreachable and placeholders were used.
    pub placeholder: bool,
}

// ---------------------------------------------------------------------------
// Scrape and store
// ---------------------------------------------------------------------------

/// Crawl `listing_url` and persist every document not already stored.
///
/// Re-discovering a known source URL is a skip, not a duplicate.
#[instrument(skip_all, fields(listing_url = %listing_url))]
pub async fn scrape_and_store<S: ArticleStore>(
    crawler: &SiteCrawler,
    store: &S,
    listing_url: &str,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeReport> {
    progress.phase("Crawling listing page");
    let crawl = crawler.crawl_listing(listing_url).await;

    let mut report = ScrapeReport {
        discovered: crawl.documents.len(),
        placeholder: crawl.used_placeholders,
        failed: if crawl.used_placeholders { 0 } else { crawl.errors.len() },
        ..ScrapeReport::default()
    };

    progress.phase("Saving articles");
    for doc in &crawl.documents {
        match store.find_by_source_url(&doc.source_url).await {
            Ok(Some(_)) => {
                debug!(url = %doc.source_url, "already stored, skipping");
                report.skipped_existing += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %doc.source_url, error = %e, "lookup failed, skipping article");
                report.failed += 1;
                continue;
            }
        }

        match store.create_original(doc).await {
            Ok(record) => {
                debug!(id = %record.id, url = %record.source_url, "original saved");
                report.saved += 1;
            }
            Err(e) => {
                warn!(url = %doc.source_url, error = %e, "failed to save article");
                report.failed += 1;
            }
        }
    }

    info!(
        discovered = report.discovered,
        saved = report.saved,
        skipped = report.skipped_existing,
        failed = report.failed,
        placeholder = report.placeholder,
        "scrape complete"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives reference discovery, synthesis and publishing for every original.
///
/// Articles are processed one at a time, with a pacing delay between them.
pub struct Orchestrator<S, P = ExternalModelStrategy> {
    store: S,
    finder: ReferenceFinder,
    crawler: SiteCrawler,
    synthesizer: Synthesizer<P>,
    options: PipelineOptions,
}

impl<S: ArticleStore, P: SynthesisStrategy> Orchestrator<S, P> {
    /// Assemble an orchestrator. `crawler` is used to fetch reference pages.
    pub fn new(
        store: S,
        finder: ReferenceFinder,
        crawler: SiteCrawler,
        synthesizer: Synthesizer<P>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            finder,
            crawler,
            synthesizer,
            options,
        }
    }

    /// Enhance every stored original.
    ///
    /// Per-article failures are logged and counted; only a failure to list
    /// originals aborts the run.
    #[instrument(skip_all)]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();

        progress.phase("Loading original articles");
        let originals = self.store.list_originals().await?;
        let total = originals.len();

        let mut report = RunReport {
            status: RunStatus::NoOriginals,
            originals_found: total,
            published: 0,
            failed: 0,
            rule_based: 0,
            external_model: 0,
            references_used: 0,
            elapsed: Duration::ZERO,
        };

        if originals.is_empty() {
            info!("no original articles found, nothing to enhance");
            report.elapsed = start.elapsed();
            progress.done(&report);
            return Ok(report);
        }

        info!(
            originals = total,
            external = self.synthesizer.has_primary(),
            "starting enhancement run"
        );

        for (i, original) in originals.iter().enumerate() {
            if i > 0 && !self.options.article_delay.is_zero() {
                tokio::time::sleep(self.options.article_delay).await;
            }

            progress.article_started(i + 1, total, &original.title);

            match self.enhance_article(original).await {
                Ok(record) => {
                    report.published += 1;
                    report.references_used += record.references.len();
                    match record.generation.as_ref().map(|g| g.method) {
                        Some(GenerationMethod::ExternalModel) => report.external_model += 1,
                        _ => report.rule_based += 1,
                    }
                    progress.article_published(&record);
                }
                Err(e) => {
                    error!(id = %original.id, title = %original.title, error = %e, "article enhancement failed");
                    report.failed += 1;
                    progress.article_failed(&original.title, &e);
                }
            }
        }

        report.status = if report.failed == 0 {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };
        report.elapsed = start.elapsed();

        progress.done(&report);

        info!(
            published = report.published,
            failed = report.failed,
            rule_based = report.rule_based,
            external_model = report.external_model,
            references = report.references_used,
            elapsed_ms = report.elapsed.as_millis(),
            "enhancement run complete"
        );

        Ok(report)
    }

    /// Find references, synthesize, and publish one derived version of `original`.
    #[instrument(skip_all, fields(id = %original.id, title = %original.title))]
    pub async fn enhance_article(&self, original: &ArticleRecord) -> Result<ArticleRecord> {
        let references = self.gather_references(&original.title).await;

        let source = original.to_source_document();
        let synthesis = self.synthesizer.synthesize(&source, &references).await;
        debug!(method = %synthesis.method, references = references.len(), "body synthesized");

        let doc = derive_document(original, synthesis, references);
        self.store.create_enhanced(&doc).await
    }

    /// Search for `topic` and scrape each hit, skipping failures and thin pages.
    async fn gather_references(&self, topic: &str) -> Vec<ReferenceDocument> {
        let urls = self.finder.find(topic).await;
        let mut references = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.options.reference_delay.is_zero() {
                tokio::time::sleep(self.options.reference_delay).await;
            }

            match self.crawler.fetch_article(url).await {
                Ok(doc) if doc.body.chars().count() > self.options.min_reference_chars => {
                    references.push(ReferenceDocument::from_source(
                        &doc,
                        self.options.reference_excerpt_chars,
                    ));
                }
                Ok(_) => debug!(%url, "reference too short, skipping"),
                Err(e) => warn!(%url, error = %e, "reference skipped"),
            }
        }

        references
    }
}

/// Shape a synthesis result into the derived document for `original`.
fn derive_document(
    original: &ArticleRecord,
    synthesis: Synthesis,
    references: Vec<ReferenceDocument>,
) -> EnhancedDocument {
    EnhancedDocument {
        original_id: original.id.clone(),
        original_url: original.source_url.clone(),
        title: format!("{}{DERIVED_TITLE_SUFFIX}", original.title),
        excerpt: truncate_chars(&synthesis.body, EXCERPT_CHARS),
        author: original.author.clone(),
        references,
        generation: GenerationMeta {
            method: synthesis.method,
            model: synthesis.model,
            generated_at: Utc::now(),
            word_count: word_count(&synthesis.body),
        },
        body: synthesis.body,
    }
}
