//! Settle All CLI Application
//!
//! A benchmark driver for the bounded settle-all map. It builds a list of URLs,
//! fetches one JSON field from each under several concurrency settings, and
//! reports timing and per-item outcomes for every run.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use settle_all_lib::{
    generate_urls, has_placeholder, load_env_config, parse_input_lines, parse_timeout,
    validate_url, ConcurrencyLimit, ConfigManager, EnvConfig, FileConfig, JsonFieldFetcher,
    SettleConfig, SettleError, Settled, Settler, DEFAULT_FIELD, DEFAULT_TIMEOUT,
};
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// URL template used when no inputs are given
const DEFAULT_TEMPLATE: &str = "https://jsonplaceholder.typicode.com/todos/{n}";

/// Number of URLs generated from the template by default
const DEFAULT_COUNT: usize = 200;

/// CLI arguments for settle-all
#[derive(Parser, Debug)]
#[command(name = "settle-all")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Benchmark a bounded-concurrency settle-all map over HTTP JSON fetches")]
#[command(
    long_about = "Fetch a JSON field from many URLs through a bounded-concurrency settle-all map.\n\nEvery URL gets exactly one fulfilled or rejected result. Each concurrency setting is run in turn and timed so the runs can be compared."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// URLs to fetch
    #[arg(value_name = "URLS", help_heading = "Inputs")]
    pub urls: Vec<String>,

    /// Input file with URLs (one per line)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Inputs"
    )]
    pub file: Option<String>,

    /// URL template with a {n} placeholder (default: jsonplaceholder todos)
    #[arg(long = "template", value_name = "TEMPLATE", help_heading = "Inputs")]
    pub template: Option<String>,

    /// Number of URLs to generate from the template (default: 200)
    #[arg(
        short = 'n',
        long = "count",
        value_name = "N",
        help_heading = "Inputs"
    )]
    pub count: Option<usize>,

    /// Preview inputs and planned runs without fetching anything
    #[arg(long = "dry-run", help_heading = "Inputs")]
    pub dry_run: bool,

    /// Concurrency per run: a number or "max" (comma-separated or multiple -c flags; default: max,10)
    #[arg(short = 'c', long = "concurrency", value_name = "LIMIT", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Benchmark")]
    pub concurrency: Option<Vec<ConcurrencyLimit>>,

    /// Run workers as spawned tasks instead of polling them in one task
    #[arg(long = "parallel", help_heading = "Benchmark")]
    pub parallel: bool,

    /// Dotted path of the JSON field to extract (default: title)
    #[arg(long = "field", value_name = "PATH", help_heading = "Fetch")]
    pub field: Option<String>,

    /// Per-request timeout, e.g. "5s", "750ms", "2m" (default: 10s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Fetch")]
    pub timeout: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Spinner while runs are in flight; pretty-printed JSON with --json
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Print every per-URL result, not only the summaries
    #[arg(long = "show-results", help_heading = "Output Format")]
    pub show_results: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logs, including per-item timing
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Fully resolved benchmark settings after config file, env, and CLI merging.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BenchmarkPlan {
    pub(crate) runs: Vec<ConcurrencyLimit>,
    pub(crate) timeout: Duration,
    pub(crate) field: String,
    pub(crate) url_template: String,
    pub(crate) count: usize,
    pub(crate) file: Option<String>,
    pub(crate) parallel: bool,
    pub(crate) json: bool,
    pub(crate) json_pretty: bool,
}

impl Default for BenchmarkPlan {
    fn default() -> Self {
        Self {
            runs: vec![ConcurrencyLimit::Unbounded, ConcurrencyLimit::Requested(10)],
            timeout: DEFAULT_TIMEOUT,
            field: DEFAULT_FIELD.to_string(),
            url_template: DEFAULT_TEMPLATE.to_string(),
            count: DEFAULT_COUNT,
            file: None,
            parallel: false,
            json: false,
            json_pretty: false,
        }
    }
}

/// Rejected URLs grouped by error category
#[derive(Debug, Default)]
pub(crate) struct ErrorStats {
    pub(crate) timeouts: Vec<String>,
    pub(crate) network_errors: Vec<String>,
    pub(crate) http_errors: Vec<String>,
    pub(crate) parsing_errors: Vec<String>,
    pub(crate) missing_fields: Vec<String>,
    pub(crate) other_errors: Vec<String>,
}

impl ErrorStats {
    fn add_error(&mut self, url: &str, error: &SettleError) {
        let bucket = match error.category() {
            "timeout" => &mut self.timeouts,
            "network" => &mut self.network_errors,
            "http" => &mut self.http_errors,
            "parse" => &mut self.parsing_errors,
            "missing-field" => &mut self.missing_fields,
            _ => &mut self.other_errors,
        };
        bucket.push(url.to_string());
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.groups().iter().any(|(_, urls)| !urls.is_empty())
    }

    /// Each category with its singular label, in display order.
    pub(crate) fn groups(&self) -> [(&'static str, &[String]); 6] {
        [
            ("timeout", self.timeouts.as_slice()),
            ("network error", self.network_errors.as_slice()),
            ("HTTP error", self.http_errors.as_slice()),
            ("parsing error", self.parsing_errors.as_slice()),
            ("missing field", self.missing_fields.as_slice()),
            ("other error", self.other_errors.as_slice()),
        ]
    }
}

/// Outcome of one benchmark run at a single concurrency setting.
#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    pub(crate) concurrency: String,
    pub(crate) workers: usize,
    pub(crate) elapsed_ms: u64,
    pub(crate) fulfilled: usize,
    pub(crate) rejected: usize,
    pub(crate) results: Vec<Settled<Value, String>>,
    #[serde(skip)]
    pub(crate) elapsed: Duration,
    #[serde(skip)]
    pub(crate) errors: ErrorStats,
}

impl RunReport {
    fn new(
        limit: ConcurrencyLimit,
        workers: usize,
        elapsed: Duration,
        urls: &[String],
        results: Vec<Settled<Value, SettleError>>,
    ) -> Self {
        let mut errors = ErrorStats::default();
        for (url, settled) in urls.iter().zip(&results) {
            if let Some(reason) = settled.reason() {
                errors.add_error(url, reason);
            }
        }

        let results: Vec<Settled<Value, String>> = results
            .into_iter()
            .map(|settled| settled.map_reason(|e| e.to_string()))
            .collect();
        let rejected = results.iter().filter(|s| s.is_rejected()).count();

        Self {
            concurrency: limit.to_string(),
            workers,
            elapsed_ms: elapsed.as_millis() as u64,
            fulfilled: results.len() - rejected,
            rejected,
            results,
            elapsed,
            errors,
        }
    }
}

/// Top-level JSON document
#[derive(Debug, Serialize)]
struct BenchmarkOutput<'a> {
    inputs: usize,
    runs: &'a [RunReport],
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "settle-all starting");

    // Run the benchmark
    if let Err(e) = run_benchmark(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the flag-derived level.
fn init_tracing(args: &Args) {
    let default_level = if args.debug {
        LevelFilter::DEBUG
    } else if args.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    let explicit_inputs = !args.urls.is_empty() || args.file.is_some();
    let template_inputs = args.template.is_some() || args.count.is_some();

    if explicit_inputs && template_inputs {
        return Err("Cannot combine --template/--count with URLs or --file".to_string());
    }

    if args.count == Some(0) {
        return Err("Count must be at least 1".to_string());
    }

    if let Some(template) = &args.template {
        if !has_placeholder(template) {
            return Err(format!(
                "Template '{}' must contain a {{n}} placeholder",
                template
            ));
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '750ms', '2m'",
                timeout
            ));
        }
    }

    if matches!(&args.concurrency, Some(runs) if runs.is_empty()) {
        return Err("At least one concurrency value is required".to_string());
    }

    if args.dry_run && args.json {
        return Err("Cannot use --dry-run with --json".to_string());
    }

    if let Some(field) = &args.field {
        if field.split('.').any(str::is_empty) && !field.is_empty() {
            return Err(format!("Invalid field path '{}'", field));
        }
    }

    Ok(())
}

/// Main benchmark logic
async fn run_benchmark(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let plan = build_config(&args)?;
    tracing::debug!(?plan, "resolved benchmark plan");

    let urls = collect_inputs(&args, &plan)?;

    if args.dry_run {
        let planned: Vec<(ConcurrencyLimit, usize)> = plan
            .runs
            .iter()
            .map(|&limit| (limit, worker_count(limit, urls.len())))
            .collect();
        ui::print_dry_run(&urls, &planned, plan.parallel);
        return Ok(());
    }

    let fetcher = JsonFieldFetcher::with_config(plan.timeout, plan.field.clone())?;

    if !plan.json {
        ui::print_header(urls.len(), &plan, &describe_inputs(&args, &plan));
    }

    let mut reports = Vec::with_capacity(plan.runs.len());
    for (run, &limit) in plan.runs.iter().enumerate() {
        let show_spinner = args.pretty && !plan.json;
        let report = execute_run(run, limit, &urls, &fetcher, plan.parallel, show_spinner).await;

        if !plan.json {
            display_run(run, plan.runs.len(), &report, &urls, &args);
        }
        reports.push(report);
    }

    if plan.json {
        display_json_results(urls.len(), &reports, plan.json_pretty)?;
    } else if reports.len() > 1 {
        ui::print_comparison(&reports);
    }

    Ok(())
}

/// Settle every URL once at the given concurrency and time the whole run.
async fn execute_run(
    run: usize,
    limit: ConcurrencyLimit,
    urls: &[String],
    fetcher: &JsonFieldFetcher,
    parallel: bool,
    show_spinner: bool,
) -> RunReport {
    let settler = Settler::with_config(
        SettleConfig::default()
            .with_concurrency(limit)
            .with_label(format!("run-{}", run + 1)),
    );
    let workers = settler.worker_count(urls.len());

    tracing::info!(run = run + 1, concurrency = %limit, workers, parallel, "starting run");

    let spinner = show_spinner.then(|| {
        ui::Spinner::start(format!(
            "Run {}: fetching {} URLs with {} worker{}...",
            run + 1,
            urls.len(),
            workers,
            ui::plural(workers)
        ))
    });

    let started = Instant::now();
    let results = if parallel {
        let fetcher = fetcher.clone();
        settler
            .settle_spawned(urls.to_vec(), move |url: String, _, _| {
                let fetcher = fetcher.clone();
                async move { fetcher.fetch_field(&url).await }
            })
            .await
    } else {
        settler
            .settle(urls, move |url, _, _| fetcher.fetch_field(url))
            .await
    };
    let elapsed = started.elapsed();

    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    RunReport::new(limit, workers, elapsed, urls, results)
}

fn worker_count(limit: ConcurrencyLimit, len: usize) -> usize {
    Settler::with_config(SettleConfig::default().with_concurrency(limit)).worker_count(len)
}

/// Resolve benchmark settings: config file, then SA_* env vars, then CLI args.
fn build_config(args: &Args) -> Result<BenchmarkPlan, Box<dyn std::error::Error>> {
    let mut plan = BenchmarkPlan::default();

    // Create config manager for file discovery
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    // Step 1: Determine config file path and load config files
    if let Some(explicit_config_path) = &args.config {
        tracing::info!(path = %explicit_config_path, "using explicit config file (--config)");

        let file_config = config_manager
            .load_file(explicit_config_path)
            .map_err(|e| {
                format!(
                    "Failed to load config file '{}': {}",
                    explicit_config_path, e
                )
            })?;

        plan = merge_file_config_into_plan(plan, file_config);
    } else if let Some(env_config_path) = &env_config.config {
        tracing::info!(path = %env_config_path, "using explicit config file (SA_CONFIG)");

        let file_config = config_manager
            .load_file(env_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_config_path, e))?;

        plan = merge_file_config_into_plan(plan, file_config);
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => {
                plan = merge_file_config_into_plan(plan, file_config);
            }
            Err(e) => {
                tracing::warn!(error = %e, "config discovery failed, using defaults");
            }
        }
    }

    // Step 2: Apply environment variables (SA_*)
    plan = apply_environment_config(plan, env_config);

    // Step 3: Apply CLI arguments (highest precedence)
    plan = apply_cli_args_to_plan(plan, args);

    Ok(plan)
}

/// Merge FileConfig into a BenchmarkPlan
fn merge_file_config_into_plan(mut plan: BenchmarkPlan, file_config: FileConfig) -> BenchmarkPlan {
    let runs = file_config.runs();

    if let Some(defaults) = file_config.defaults {
        let limit = defaults.concurrency.as_deref().map(str::parse::<ConcurrencyLimit>);
        if let Some(Ok(limit)) = limit {
            plan.runs = vec![limit];
        }
        if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout) {
            plan.timeout = timeout;
        }
        if let Some(field) = defaults.field {
            plan.field = field;
        }
    }

    if let Some(source) = file_config.source {
        if let Some(template) = source.url_template {
            plan.url_template = template;
        }
        if let Some(count) = source.count {
            plan.count = count;
        }
        if source.file.is_some() {
            plan.file = source.file;
        }
    }

    // An explicit run list wins over a single default concurrency
    if let Some(runs) = runs.filter(|r| !r.is_empty()) {
        plan.runs = runs;
    }
    if let Some(parallel) = file_config.benchmark.and_then(|b| b.parallel) {
        plan.parallel = parallel;
    }

    if let Some(output) = file_config.output {
        if let Some(json) = output.json {
            plan.json = json;
        }
        if let Some(json_pretty) = output.json_pretty {
            plan.json_pretty = json_pretty;
        }
    }

    plan
}

/// Apply SA_* environment values to the plan.
fn apply_environment_config(mut plan: BenchmarkPlan, env_config: EnvConfig) -> BenchmarkPlan {
    if let Some(limit) = env_config.concurrency {
        plan.runs = vec![limit];
    }
    if let Some(runs) = env_config.runs {
        plan.runs = runs;
    }
    if let Some(timeout) = env_config.timeout.as_deref().and_then(parse_timeout) {
        plan.timeout = timeout;
    }
    if let Some(field) = env_config.field {
        plan.field = field;
    }
    if let Some(template) = env_config.url_template {
        plan.url_template = template;
    }
    if let Some(count) = env_config.count {
        plan.count = count;
    }
    if let Some(parallel) = env_config.parallel {
        plan.parallel = parallel;
    }
    if let Some(json) = env_config.json {
        plan.json = json;
    }
    if env_config.file.is_some() {
        plan.file = env_config.file;
    }

    plan
}

/// Apply CLI arguments to the plan (highest precedence).
///
/// Boolean flags only ever switch a setting on, so an absent flag keeps the
/// value from the environment or config file.
fn apply_cli_args_to_plan(mut plan: BenchmarkPlan, args: &Args) -> BenchmarkPlan {
    if let Some(runs) = args.concurrency.clone().filter(|r| !r.is_empty()) {
        plan.runs = runs;
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_timeout) {
        plan.timeout = timeout;
    }
    if let Some(field) = &args.field {
        plan.field = field.clone();
    }
    if let Some(template) = &args.template {
        plan.url_template = template.clone();
    }
    if let Some(count) = args.count {
        plan.count = count;
    }
    // Generated inputs replace a file configured outside the command line
    if args.template.is_some() || args.count.is_some() {
        plan.file = None;
    }
    if args.file.is_some() {
        plan.file = args.file.clone();
    }
    if args.parallel {
        plan.parallel = true;
    }
    if args.json {
        plan.json = true;
    }
    if args.pretty {
        plan.json_pretty = true;
    }

    plan
}

/// Get the list of URLs from CLI args, an input file, or the template.
fn collect_inputs(
    args: &Args,
    plan: &BenchmarkPlan,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut urls: Vec<String> = args.urls.iter().map(|u| u.trim().to_string()).collect();

    if let Some(file) = &plan.file {
        urls.extend(read_urls_from_file(file)?);
    }

    if urls.is_empty() {
        urls = generate_urls(&plan.url_template, plan.count)?;
    }

    Ok(urls)
}

/// Short description of where the inputs came from, for the header.
fn describe_inputs(args: &Args, plan: &BenchmarkPlan) -> String {
    match (&plan.file, args.urls.is_empty()) {
        (Some(file), true) => format!("from {}", file),
        (Some(file), false) => format!("from arguments and {}", file),
        (None, false) => "from arguments".to_string(),
        (None, true) => format!("from {}", plan.url_template),
    }
}

/// Read URLs from a file, skipping blank lines, comments, and invalid URLs.
fn read_urls_from_file(file_path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let path = std::path::Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {}", file_path).into());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SettleError::file_error(file_path, e.to_string()))?;

    let mut urls = Vec::new();
    let mut invalid_lines = Vec::new();
    for line in parse_input_lines(&content) {
        // Handle inline comments
        let url = line.split(" #").next().unwrap_or_default().trim();
        match validate_url(url) {
            Ok(()) => urls.push(url.to_string()),
            Err(e) => invalid_lines.push(e.to_string()),
        }
    }

    // Report invalid lines if any
    if !invalid_lines.is_empty() {
        eprintln!(
            "Warning: skipped {} invalid entr{} in {}:",
            invalid_lines.len(),
            if invalid_lines.len() == 1 { "y" } else { "ies" },
            file_path
        );
        for invalid in &invalid_lines[..invalid_lines.len().min(5)] {
            eprintln!("  {}", invalid);
        }
        if invalid_lines.len() > 5 {
            eprintln!("  ... and {} more invalid entries", invalid_lines.len() - 5);
        }
        eprintln!();
    }

    if urls.is_empty() {
        return Err("No valid URLs found in the file.".into());
    }

    Ok(urls)
}

/// Display one run in human-readable text format
fn display_run(run: usize, total_runs: usize, report: &RunReport, urls: &[String], args: &Args) {
    ui::print_run_header(run + 1, total_runs, report);

    if args.show_results {
        for (index, (url, settled)) in urls.iter().zip(&report.results).enumerate() {
            ui::print_result(index, url, settled);
        }
        println!();
    }

    ui::print_run_summary(report);
    ui::print_error_summary(&report.errors);
    println!();
}

/// Display all runs as one JSON document
fn display_json_results(
    inputs: usize,
    reports: &[RunReport],
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = BenchmarkOutput {
        inputs,
        runs: reports,
    };
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}
