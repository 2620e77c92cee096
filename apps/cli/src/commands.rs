//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use categorizer_core::{
    BatchOptions, BatchProgress, BatchStage, ClassifyEvent, Classifier, run_batch,
};
use categorizer_genai::ChatMessage;
use categorizer_shared::{AppConfig, ClassificationResult, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Categorizer — sort businesses into industry verticals from their websites.
#[derive(Parser)]
#[command(
    name = "categorizer",
    version,
    about = "Classify businesses into industry verticals from their website content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Model identifier, overriding config and environment.
    #[arg(long, global = true)]
    pub model: Option<String>,

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
    /// Classify one business from a URL or free text containing one.
    Classify {
        /// Website URL, or text that contains it.
        input: String,

        /// Company name or description, also used for the search fallback.
        #[arg(short, long, default_value = "")]
        company: String,

        /// Earlier user message to send as conversation context (repeatable).
        #[arg(long)]
        context: Vec<String>,
    },

    /// Classify every row of a CSV file.
    Batch {
        /// Input CSV with `Customer` and `Web Address` columns.
        input: PathBuf,

        /// Output CSV (defaults to output_<timestamp>.csv).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Rows classified concurrently.
        #[arg(long)]
        concurrency: Option<usize>,
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
        0 => "categorizer=info",
        1 => "categorizer=debug",
        _ => "categorizer=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let model = cli.model;
    match cli.command {
        Command::Classify {
            input,
            company,
            context,
        } => {
            let history = context.into_iter().map(ChatMessage::user).collect();
            cmd_classify(&input, &company, history, model.as_deref()).await
        }
        Command::Batch {
            input,
            out,
            concurrency,
        } => cmd_batch(&input, out, concurrency, model.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(model.as_deref()).await,
        },
    }
}

/// Load config with CLI flag overrides applied on top.
fn resolve_config(model: Option<&str>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(model) = model {
        config.genai.model_id = model.to_string();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_classify(
    input: &str,
    company: &str,
    history: Vec<ChatMessage>,
    model: Option<&str>,
) -> Result<()> {
    let config = resolve_config(model)?;
    let classifier = Classifier::new(&config)?;

    info!(input, company, "classifying");

    let mut events = classifier.classify(input, company, history);
    let mut stdout = std::io::stdout();
    let mut result = None;

    while let Some(event) = events.recv().await {
        match event {
            ClassifyEvent::Fragment(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            ClassifyEvent::Completed(r) => result = Some(r),
        }
    }

    let result = result.ok_or_else(|| eyre!("classification ended without a result"))?;
    print_result(&result);
    Ok(())
}

fn print_result(result: &ClassificationResult) {
    println!();
    println!();
    println!("  Primary Category:     {}", result.primary_category);
    println!("  Secondary Category:   {}", result.secondary_category);
    println!("  Confidence:           {}", result.confidence);
    println!("  Justification:        {}", result.confidence_justification);
    println!("  Explanation:          {}", result.explanation);
    println!("  Current Category:     {}", result.current_category_evaluation);
    println!();
}

async fn cmd_batch(
    input: &Path,
    out: Option<PathBuf>,
    concurrency: Option<usize>,
    model: Option<&str>,
) -> Result<()> {
    let config = resolve_config(model)?;
    let classifier = Classifier::new(&config)?;

    let mut options = BatchOptions::from(&config);
    if let Some(n) = concurrency {
        if n == 0 {
            return Err(eyre!("--concurrency must be at least 1"));
        }
        options.concurrency = n;
    }

    let output = out.unwrap_or_else(default_output_path);

    info!(
        input = %input.display(),
        output = %output.display(),
        concurrency = options.concurrency,
        "starting batch"
    );

    let reporter = CliProgress::new();
    let summary = run_batch(&classifier, input, &output, &options, &reporter).await;
    reporter.spinner.finish_and_clear();
    let summary = summary?;

    println!();
    println!("  Batch complete!");
    println!("  Rows:        {}", summary.rows);
    println!("  Classified:  {}", summary.classified);
    println!("  Sentinels:   {}", summary.sentinel_rows);
    println!("  Errors:      {}", summary.errors);
    println!("  Output:      {}", summary.output.display());
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "output_{}.csv",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
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
        let style = ProgressStyle::with_template("{spinner:.cyan} [{pos}/6] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl BatchProgress for CliProgress {
    fn stage(&self, stage: BatchStage) {
        self.spinner.inc(1);
        self.spinner.set_message(stage.label());
        if stage == BatchStage::Complete {
            self.spinner.finish_and_clear();
        }
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(model: Option<&str>) -> Result<()> {
    let config = resolve_config(model)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
