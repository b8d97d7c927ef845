//! # macro_news
//!
//! Collects macroeconomic news from an Alpaca-style news API over a
//! multi-year date range and writes the relevant articles to a CSV file.
//!
//! ## Features
//!
//! - Splits the date range into 30-day windows and pages through each one
//! - Stays under a per-minute request budget and retries transient failures
//!   with exponential backoff
//! - Filters articles by a macroeconomic keyword list, or by a TF-IDF +
//!   logistic regression classifier trained on labeled headlines
//! - Writes `Date,Headline,Content` rows as they arrive
//!
//! ## Usage
//!
//! ```sh
//! export APCA_API_KEY_ID=... APCA_API_SECRET_KEY=...
//! macro_news fetch --years 5 -o macroeconomic_news.csv
//! macro_news train -l news_with_relevance.csv -m model.json
//! macro_news fetch --filter classifier --model model.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Windowing**: partition the range into date windows ([`window`])
//! 2. **Fetching**: page through each window under a rate budget with retries ([`fetch`])
//! 3. **Filtering**: keyword or classifier predicate ([`filter`], [`classifier`])
//! 4. **Output**: append relevant rows to CSV ([`output`])

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod classifier;
mod cli;
mod clock;
mod config;
mod fetch;
mod filter;
mod models;
mod output;
mod pipeline;
mod rate_limit;
mod retry;
mod utils;
mod window;

use api::{Credentials, NewsClient};
use classifier::TextClassifier;
use classifier::training::{TrainedClassifier, TrainingConfig, train_from_file};
use cli::{Cli, Command, FetchArgs, FilterKind, TrainArgs};
use clock::{Clock, SystemClock};
use config::Settings;
use fetch::FetchLoop;
use filter::{KeywordFilter, RelevanceFilter};
use output::CsvSink;
use rate_limit::RateBudget;
use retry::RetryPolicy;
use utils::ensure_parent_writable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("macro_news starting up");

    let cli = Cli::parse();
    debug!(?cli.command, "Parsed CLI arguments");

    match cli.command {
        Command::Fetch(args) => run_fetch(args).await?,
        Command::Train(args) => run_train(args)?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(output = %args.output.display(), filter = ?args.filter))]
async fn run_fetch(args: FetchArgs) -> Result<(), Box<dyn Error>> {
    let settings = args
        .apply(Settings::load_or_default(args.config.as_deref())?)
        .normalized()?;

    // Fail on a bad output path before spending any requests.
    if let Err(e) = ensure_parent_writable(&args.output) {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let relevance = build_filter(&args, &settings)?;

    let last = args.end.unwrap_or_else(window::today);
    let first = match args.start {
        Some(start) => start,
        None => window::years_back(last, settings.years)?.0,
    };
    let windows = window::partition(first, last, settings.window_days)?;
    info!(%first, %last, windows = windows.len(), "Date range partitioned");

    let client = NewsClient::new(
        &settings.base_url,
        Credentials {
            key_id: args.key_id.clone(),
            secret_key: args.secret_key.clone(),
        },
    )?
    .with_timeout(Duration::from_secs(settings.request_timeout_secs));
    info!(
        endpoint = %client.endpoint(),
        timeout_secs = settings.request_timeout_secs,
        "News client ready"
    );

    let clock = SystemClock;
    let fetch = FetchLoop::new(
        client,
        clock,
        RateBudget::new(settings.requests_per_minute, clock.now()),
        RetryPolicy::new(
            settings.max_attempts,
            Duration::from_secs(settings.base_delay_secs),
        ),
        settings.batch_size,
    );
    info!(
        batch_size = settings.batch_size,
        requests_per_minute = fetch.budget().limit(),
        max_attempts = fetch.retry().max_attempts(),
        "Fetch loop configured"
    );

    let mut sink = CsvSink::create(&args.output)?;
    let summary = match pipeline::collect_relevant_news(&fetch, &windows, &relevance, &mut sink).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, rows = sink.rows(), "Run aborted; rows written so far are kept");
            sink.finish()?;
            return Err(e);
        }
    };
    let rows = sink.finish()?;

    info!(
        windows = summary.fetch.windows_visited,
        abandoned = summary.fetch.windows_abandoned,
        articles = summary.fetch.articles_seen,
        rows,
        "Fetch complete"
    );
    Ok(())
}

/// Select the relevance predicate: keywords, a saved model, or a model trained now.
fn build_filter(args: &FetchArgs, settings: &Settings) -> Result<RelevanceFilter, Box<dyn Error>> {
    let relevance = match args.filter {
        FilterKind::Keyword => {
            let keywords = KeywordFilter::new(settings.keywords.iter().cloned());
            debug!(keywords = ?keywords.keywords(), "Keyword vocabulary");
            RelevanceFilter::Keywords(keywords)
        }
        FilterKind::Classifier => match &args.model {
            Some(path) => RelevanceFilter::Classifier(TextClassifier::load(path)?),
            None => {
                let trained = train_from_file(&args.labeled_data, &TrainingConfig::default())?;
                log_report(&trained);
                RelevanceFilter::Classifier(trained.classifier)
            }
        },
    };
    info!(filter = relevance.name(), "Relevance filter selected");
    Ok(relevance)
}

#[instrument(level = "info", skip_all, fields(labeled_data = %args.labeled_data.display()))]
fn run_train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let config = TrainingConfig {
        test_ratio: args.test_ratio,
        seed: args.seed,
        ..TrainingConfig::default()
    };
    let trained = train_from_file(&args.labeled_data, &config)?;
    log_report(&trained);

    if let Some(path) = &args.model_out {
        save_model(&trained.classifier, path)?;
    }
    Ok(())
}

fn log_report(trained: &TrainedClassifier) {
    info!(
        train = trained.train_size,
        test = trained.test_size,
        accuracy = trained.report.accuracy,
        "Held-out evaluation"
    );
    info!("Classification report:\n{}", trained.report);
}

fn save_model(classifier: &TextClassifier, path: &Path) -> Result<(), Box<dyn Error>> {
    ensure_parent_writable(path)?;
    classifier.save(path)
}
