//! Command-line interface definitions for macro_news.
//!
//! Two subcommands share one binary:
//!
//! | Command | Does |
//! |---------|------|
//! | `fetch` | walk the date range, filter articles, write the CSV |
//! | `train` | fit the relevance classifier on labeled data and report |
//!
//! API credentials are read from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`
//! when not passed as flags. Numeric fetch options fall back to the YAML
//! settings file, then to built-in defaults.

use crate::classifier::training::{DEFAULT_SEED, DEFAULT_TEST_RATIO};
use crate::config::Settings;
use crate::output::DEFAULT_OUTPUT_PATH;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default labeled dataset for the classifier.
pub const DEFAULT_LABELED_DATA: &str = "news_with_relevance.csv";

/// Macroeconomic news collector.
///
/// # Examples
///
/// ```sh
/// # Keyword filter over the last five years
/// macro_news fetch
///
/// # Classifier filter, trained on the fly
/// macro_news fetch --filter classifier --labeled-data news_with_relevance.csv
///
/// # Train once, save, then reuse
/// macro_news train --model-out model.json
/// macro_news fetch --filter classifier --model model.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch news over a date range and write relevant articles to CSV
    Fetch(FetchArgs),
    /// Train the relevance classifier and print its evaluation report
    Train(TrainArgs),
}

/// Which relevance predicate `fetch` applies.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    Keyword,
    Classifier,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Output CSV path (truncated on every run)
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// First day of the range (YYYY-MM-DD); defaults to `--years` before `--end`
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the range, inclusive (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Look-back period in years when `--start` is not given
    #[arg(long)]
    pub years: Option<u32>,

    /// Days per date window
    #[arg(long)]
    pub window_days: Option<u32>,

    /// Articles requested per page
    #[arg(short, long)]
    pub batch_size: Option<u32>,

    /// Request budget per minute
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Attempts per page before the window is abandoned
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// News API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Relevance filter
    #[arg(short, long, value_enum, default_value_t = FilterKind::Keyword)]
    pub filter: FilterKind,

    /// Saved classifier model (JSON); skips training when given
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Labeled dataset used to train the classifier when no model is given
    #[arg(long, default_value = DEFAULT_LABELED_DATA)]
    pub labeled_data: PathBuf,

    /// API key id
    #[arg(long, env = "APCA_API_KEY_ID", hide_env_values = true)]
    pub key_id: String,

    /// API secret key
    #[arg(long, env = "APCA_API_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
}

impl FetchArgs {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(years) = self.years {
            settings.years = years;
        }
        if let Some(days) = self.window_days {
            settings.window_days = days;
        }
        if let Some(size) = self.batch_size {
            settings.batch_size = size;
        }
        if let Some(limit) = self.rate_limit {
            settings.requests_per_minute = limit;
        }
        if let Some(attempts) = self.max_attempts {
            settings.max_attempts = attempts;
        }
        if let Some(secs) = self.timeout_secs {
            settings.request_timeout_secs = secs;
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
        }
        settings
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Labeled dataset with Headline, Content, Relevant columns
    #[arg(short, long, default_value = DEFAULT_LABELED_DATA)]
    pub labeled_data: PathBuf,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = DEFAULT_TEST_RATIO)]
    pub test_ratio: f64,

    /// Shuffle seed for the train/test split
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Where to save the fitted model (JSON)
    #[arg(short, long)]
    pub model_out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_args(extra: &[&str]) -> FetchArgs {
        let mut argv = vec![
            "macro_news",
            "fetch",
            "--key-id",
            "k",
            "--secret-key",
            "s",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Fetch(args) => args,
            other => panic!("expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_defaults() {
        let args = fetch_args(&[]);
        assert_eq!(args.output, PathBuf::from("macroeconomic_news.csv"));
        assert_eq!(args.filter, FilterKind::Keyword);
        assert_eq!(args.labeled_data, PathBuf::from("news_with_relevance.csv"));
        assert!(args.start.is_none());
        assert!(args.model.is_none());
        assert_eq!(args.key_id, "k");
    }

    #[test]
    fn test_fetch_flags() {
        let args = fetch_args(&[
            "-o",
            "/tmp/out.csv",
            "--start",
            "2020-01-01",
            "--end",
            "2020-12-31",
            "--filter",
            "classifier",
            "--model",
            "model.json",
            "-b",
            "50",
        ]);
        assert_eq!(args.output, PathBuf::from("/tmp/out.csv"));
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(args.end, NaiveDate::from_ymd_opt(2020, 12, 31));
        assert_eq!(args.filter, FilterKind::Classifier);
        assert_eq!(args.model, Some(PathBuf::from("model.json")));
        assert_eq!(args.batch_size, Some(50));
    }

    #[test]
    fn test_flags_override_settings() {
        let args = fetch_args(&["--rate-limit", "100", "--window-days", "7", "--timeout-secs", "3"]);
        let settings = args.apply(Settings::default());
        assert_eq!(settings.requests_per_minute, 100);
        assert_eq!(settings.window_days, 7);
        assert_eq!(settings.request_timeout_secs, 3);
        // Untouched values keep their settings-file defaults.
        assert_eq!(settings.batch_size, Settings::default().batch_size);
        assert_eq!(settings.base_url, Settings::default().base_url);
    }

    #[test]
    fn test_bad_date_rejected() {
        let result = Cli::try_parse_from([
            "macro_news",
            "fetch",
            "--key-id",
            "k",
            "--secret-key",
            "s",
            "--start",
            "01/02/2020",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_train_parsing() {
        let cli = Cli::parse_from(["macro_news", "train", "-l", "labels.csv", "--seed", "7", "-m", "m.json"]);
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.labeled_data, PathBuf::from("labels.csv"));
                assert_eq!(args.seed, 7);
                assert_eq!(args.test_ratio, 0.2);
                assert_eq!(args.model_out, Some(PathBuf::from("m.json")));
            }
            other => panic!("expected train, got {:?}", other),
        }
    }
}
