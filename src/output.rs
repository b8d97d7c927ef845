//! CSV output for relevant articles.
//!
//! The file is truncated when the sink is opened and the header row is
//! written immediately, so even a run that finds nothing leaves a valid file.
//! Each row is flushed as soon as it is written.
//!
//! # Output Format
//!
//! ```text
//! Date,Headline,Content
//! 05/14/2023,US GDP beats forecasts,Growth accelerated in the first quarter
//! ```

use crate::models::FilteredArticle;
use csv::{Writer, WriterBuilder};
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Column names, in order.
pub const HEADER: [&str; 3] = ["Date", "Headline", "Content"];

/// Default output path.
pub const DEFAULT_OUTPUT_PATH: &str = "macroeconomic_news.csv";

/// Append-only CSV writer for one run.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    writer: Writer<File>,
    rows: usize,
}

impl CsvSink {
    /// Create (or truncate) `path` and write the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the header cannot
    /// be written.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn create(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush()?;
        info!("Opened output file");
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    /// Append one row and flush it to disk.
    pub fn write(&mut self, article: &FilteredArticle) -> Result<(), Box<dyn Error>> {
        self.writer.serialize(article)?;
        self.writer.flush()?;
        self.rows += 1;
        debug!(rows = self.rows, "Wrote row");
        Ok(())
    }

    /// Data rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close, returning the number of data rows.
    pub fn finish(mut self) -> Result<usize, Box<dyn Error>> {
        self.writer.flush()?;
        info!(path = %self.path.display(), rows = self.rows, "Closed output file");
        Ok(self.rows)
    }
}
