//! Batch orchestration over a CSV of businesses.
//!
//! Rows are classified concurrently under a bounded pool. Structural problems
//! with the input (unreadable file, no rows, missing column) abort before any
//! row runs; everything that goes wrong inside a row becomes a sentinel row.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use categorizer_shared::{
    AppConfig, ClassificationError, ClassificationResult, CompanyProfile, NOT_AVAILABLE, Result,
};

use crate::classify::{Classifier, Verdict};

pub const CUSTOMER_COLUMN: &str = "Customer";
pub const WEB_ADDRESS_COLUMN: &str = "Web Address";
pub const CITY_COLUMN: &str = "Maximum of City";
pub const COUNTRY_COLUMN: &str = "Maximum of Country";
pub const STATE_COLUMN: &str = "Maximum of State/Province";

/// Columns written for every row, in order.
pub const OUTPUT_COLUMNS: [&str; 7] = [
    "Primary Category",
    "Secondary Category",
    "Confidence",
    "Explanation",
    "Confidence Justification",
    "Current Category Evaluation",
    "Match?",
];

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Batch-level milestones. Each fires exactly once per batch, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Start,
    PagesRead,
    SentToModel,
    ResultsRead,
    OutputWritten,
    Complete,
}

impl BatchStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "Reading input file",
            Self::PagesRead => "Reading websites",
            Self::SentToModel => "Sending to generation service",
            Self::ResultsRead => "Reading results",
            Self::OutputWritten => "Writing output file",
            Self::Complete => "Complete",
        }
    }
}

/// Progress callback for batch runs.
pub trait BatchProgress: Send + Sync {
    fn stage(&self, stage: BatchStage);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn stage(&self, _stage: BatchStage) {}
}

// ---------------------------------------------------------------------------
// Options and summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Rows classified at once.
    pub concurrency: usize,
    /// Column holding an existing category to compare against.
    pub current_category_column: String,
}

impl From<&AppConfig> for BatchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.batch_concurrency.max(1),
            current_category_column: config.defaults.current_category_column.clone(),
        }
    }
}

/// Counts reported after a batch finishes.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub rows: usize,
    /// Rows the model answered.
    pub classified: usize,
    /// Rows recorded with a no-URL, no-content, or service sentinel.
    pub sentinel_rows: usize,
    /// Rows whose processing failed outright.
    pub errors: usize,
    pub elapsed: Duration,
    pub output: PathBuf,
}

// ---------------------------------------------------------------------------
// Input table
// ---------------------------------------------------------------------------

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| {
            ClassificationError::validation(format!("required column '{name}' missing from input"))
        })
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|e| ClassificationError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ClassificationError::Table(format!("failed to read headers: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(ClassificationError::validation(format!(
            "input file {} is empty",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| ClassificationError::Table(format!("failed to read row: {e}")))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// Resolved positions of the columns a row is built from.
struct Columns {
    customer: usize,
    web_address: usize,
    city: Option<usize>,
    country: Option<usize>,
    state: Option<usize>,
    current_category: Option<usize>,
}

impl Columns {
    fn resolve(table: &Table, current_category_column: &str) -> Result<Self> {
        Ok(Self {
            customer: table.require(CUSTOMER_COLUMN)?,
            web_address: table.require(WEB_ADDRESS_COLUMN)?,
            city: table.column(CITY_COLUMN),
            country: table.column(COUNTRY_COLUMN),
            state: table.column(STATE_COLUMN),
            current_category: table.column(current_category_column),
        })
    }

    fn profile(&self, row: &[String]) -> CompanyProfile {
        let cell = |i: Option<usize>| {
            i.and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        CompanyProfile {
            customer: cell(Some(self.customer)),
            city: cell(self.city),
            country: cell(self.country),
            state: cell(self.state),
            web_address: cell(Some(self.web_address)),
            current_category: cell(self.current_category),
        }
    }
}

// ---------------------------------------------------------------------------
// Row outcomes
// ---------------------------------------------------------------------------

enum RowOutcome {
    Classified(ClassificationResult),
    Sentinel(ClassificationResult),
    Failed(ClassificationResult),
}

impl RowOutcome {
    fn result(&self) -> &ClassificationResult {
        match self {
            Self::Classified(r) | Self::Sentinel(r) | Self::Failed(r) => r,
        }
    }
}

impl From<Verdict> for RowOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Classified(r) => Self::Classified(r),
            Verdict::Sentinel(r) => Self::Sentinel(r),
        }
    }
}

/// `Yes`/`No` against the existing category, `N/A` when there is nothing to compare.
fn match_label(outcome: &RowOutcome, current_category: Option<&str>) -> &'static str {
    match (outcome, current_category) {
        (RowOutcome::Classified(result), Some(current)) => {
            if result.primary_category.to_lowercase() == current.to_lowercase() {
                "Yes"
            } else {
                "No"
            }
        }
        _ => NOT_AVAILABLE,
    }
}

fn output_values(outcome: &RowOutcome, current_category: Option<&str>) -> [String; 7] {
    let r = outcome.result();
    [
        r.primary_category.clone(),
        r.secondary_category.clone(),
        r.confidence.to_string(),
        r.explanation.clone(),
        r.confidence_justification.clone(),
        r.current_category_evaluation.clone(),
        match_label(outcome, current_category).to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Classify every row of `input` and write the augmented table to `output`.
///
/// Output rows keep input order and input columns; classification columns are
/// overwritten when the input already has them and appended otherwise.
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn run_batch(
    classifier: &Classifier,
    input: &Path,
    output: &Path,
    options: &BatchOptions,
    progress: &dyn BatchProgress,
) -> Result<BatchSummary> {
    let started = Instant::now();
    progress.stage(BatchStage::Start);

    let table = read_table(input)?;
    let columns = Columns::resolve(&table, &options.current_category_column)?;
    if table.rows.is_empty() {
        return Err(ClassificationError::validation(format!(
            "input file {} has no data rows",
            input.display()
        )));
    }
    if columns.current_category.is_none() {
        info!(column = %options.current_category_column, "no current category column, Match? will be N/A");
    }
    info!(rows = table.rows.len(), concurrency = options.concurrency, "batch started");

    progress.stage(BatchStage::PagesRead);

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut outcomes: Vec<Option<RowOutcome>> = Vec::with_capacity(table.rows.len());
    let mut handles = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        let profile = columns.profile(row);

        if profile.web_address.is_empty() {
            warn!(row = index, customer = %profile.customer, "no web address");
            outcomes.push(Some(RowOutcome::Sentinel(ClassificationResult::no_url(Some(
                &profile.customer,
            )))));
            continue;
        }
        outcomes.push(None);

        let classifier = classifier.clone();
        let sem = semaphore.clone();
        let customer = profile.customer.clone();
        let web_address = profile.web_address.clone();

        let handle = tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| ClassificationError::Network(format!("row pool closed: {e}")))?;
            classifier.classify_profile(&profile, Vec::new(), None).await
        });
        handles.push((index, customer, web_address, handle));
    }

    progress.stage(BatchStage::SentToModel);

    for (index, customer, web_address, handle) in handles {
        let outcome = match handle.await {
            Ok(Ok(verdict)) => RowOutcome::from(verdict),
            Ok(Err(e)) => {
                error!(row = index, customer = %customer, error = %e, "row failed");
                RowOutcome::Failed(ClassificationResult::row_error(
                    &customer,
                    &web_address,
                    &e.to_string(),
                ))
            }
            Err(e) => {
                error!(row = index, customer = %customer, error = %e, "row task failed");
                RowOutcome::Failed(ClassificationResult::row_error(
                    &customer,
                    &web_address,
                    &e.to_string(),
                ))
            }
        };
        info!(
            row = index,
            customer = %customer,
            primary = %outcome.result().primary_category,
            "row processed"
        );
        outcomes[index] = Some(outcome);
    }

    progress.stage(BatchStage::ResultsRead);

    let outcomes: Vec<RowOutcome> = outcomes.into_iter().flatten().collect();
    write_output(output, &table, &columns, &outcomes)?;

    progress.stage(BatchStage::OutputWritten);

    let summary = BatchSummary {
        rows: outcomes.len(),
        classified: outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Classified(_)))
            .count(),
        sentinel_rows: outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Sentinel(_)))
            .count(),
        errors: outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Failed(_)))
            .count(),
        elapsed: started.elapsed(),
        output: output.to_path_buf(),
    };
    info!(
        rows = summary.rows,
        classified = summary.classified,
        sentinel_rows = summary.sentinel_rows,
        errors = summary.errors,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch complete"
    );

    progress.stage(BatchStage::Complete);
    Ok(summary)
}

fn write_output(
    path: &Path,
    table: &Table,
    columns: &Columns,
    outcomes: &[RowOutcome],
) -> Result<()> {
    let mut headers = table.headers.clone();
    let mut targets = [0usize; OUTPUT_COLUMNS.len()];
    for (slot, name) in targets.iter_mut().zip(OUTPUT_COLUMNS) {
        *slot = match table.column(name) {
            Some(i) => i,
            None => {
                headers.push(name.to_string());
                headers.len() - 1
            }
        };
    }

    let table_err =
        |e: csv::Error| ClassificationError::Table(format!("failed to write {}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(table_err)?;
    writer.write_record(&headers).map_err(table_err)?;

    for (index, (row, outcome)) in table.rows.iter().zip(outcomes).enumerate() {
        let mut record = row.clone();
        if record.len() > table.headers.len() {
            warn!(
                row = index,
                fields = record.len(),
                columns = table.headers.len(),
                "row has more fields than the header, extra fields dropped"
            );
            record.truncate(table.headers.len());
        }
        record.resize(headers.len(), String::new());

        let current = columns
            .current_category
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""));
        for (target, value) in targets.iter().zip(output_values(outcome, current)) {
            record[*target] = value;
        }
        writer.write_record(&record).map_err(table_err)?;
    }

    writer.flush().map_err(|e| ClassificationError::io(path, e))?;
    info!(path = %path.display(), rows = outcomes.len(), "output written");
    Ok(())
}
