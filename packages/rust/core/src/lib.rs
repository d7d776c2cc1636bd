//! Core pipeline orchestration and domain logic for Blogsmith.
//!
//! This crate ties together crawling, reference discovery, synthesis, and
//! storage into end-to-end workflows (`scrape_and_store`, `Orchestrator::run`).

pub mod pipeline;
pub mod store;
pub mod synthesis;

pub use pipeline::{
    Orchestrator, ProgressReporter, RunReport, RunStatus, ScrapeReport, SilentProgress,
    scrape_and_store,
};
pub use store::ArticleStore;
pub use synthesis::{
    ExternalModelStrategy, RuleBasedStrategy, Synthesis, SynthesisStrategy, Synthesizer,
    domain_of,
};
