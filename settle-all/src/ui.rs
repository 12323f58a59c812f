//! Terminal display logic for the settle-all CLI.
//!
//! This module handles all text output: the run header, per-URL result lines,
//! run summaries, the categorized rejection summary, the final comparison table,
//! and the spinner shown while a run is in flight. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use serde_json::Value;
use settle_all_lib::{ConcurrencyLimit, Settled};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{BenchmarkPlan, ErrorStats, RunReport};

const URL_WIDTH: usize = 48;
const VALUE_WIDTH: usize = 60;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner on stderr, so stdout stays clean for results.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message; it ticks until [`Spinner::stop`].
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let ticking = Arc::clone(&running);

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut ticker = tokio::time::interval(Duration::from_millis(80));
            for frame in SPINNER_FRAMES.iter().cycle() {
                if !ticking.load(Ordering::Relaxed) {
                    break;
                }
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                ticker.tick().await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear its line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print the styled header at the start of a benchmark.
pub fn print_header(url_count: usize, plan: &BenchmarkPlan, source: &str) {
    println!(
        "{} {} {}",
        style("settle-all").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Fetching {} URL{} {}",
            url_count,
            plural(url_count),
            source
        ))
        .dim(),
    );

    let runs: Vec<String> = plan.runs.iter().map(ConcurrencyLimit::to_string).collect();
    let meta_parts = [
        format!("Field: {}", display_field(&plan.field)),
        format!("Timeout: {:?}", plan.timeout),
        format!("Runs: {}", runs.join(", ")),
        format!(
            "Workers: {}",
            if plan.parallel { "spawned" } else { "cooperative" }
        ),
    ];

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

/// Print the title line for one run.
pub fn print_run_header(run: usize, total_runs: usize, report: &RunReport) {
    println!(
        "  {} {}",
        style(format!(
            "── Run {}/{}: concurrency {} ({} worker{}) ",
            run,
            total_runs,
            report.concurrency,
            report.workers,
            plural(report.workers)
        ))
        .cyan()
        .bold(),
        style("─".repeat(20)).cyan().dim(),
    );
}

// ── Single result line ───────────────────────────────────────────────────────

/// Format and print a single settled result with colors and alignment.
pub fn print_result(index: usize, url: &str, settled: &Settled<Value, String>) {
    let padded_url = pad_str(url, URL_WIDTH, Alignment::Left, Some(".."));
    let prefix = style(format!("[{:>3}]", index)).dim();

    match settled {
        Settled::Fulfilled { value } => {
            println!(
                "  {} {}  {}  {}",
                prefix,
                style(&padded_url).white(),
                style("FULFILLED").green().bold(),
                format_value(value),
            );
        }
        Settled::Rejected { reason } => {
            println!(
                "  {} {}  {}  {}",
                prefix,
                style(&padded_url).white(),
                style("REJECTED").red().bold(),
                style(reason).dim(),
            );
        }
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the summary bar for one run with colored counts.
pub fn print_run_summary(report: &RunReport) {
    let total = report.fulfilled + report.rejected;
    println!(
        "  {} URL{} in {}  {}  {}  {}  {}",
        style(total).bold(),
        plural(total),
        format_elapsed(report.elapsed),
        style("|").dim(),
        style(format!("{} fulfilled", report.fulfilled)).green(),
        style("|").dim(),
        style(format!("{} rejected", report.rejected)).red(),
    );
}

// ── Error summary ────────────────────────────────────────────────────────────

/// Print a categorized rejection summary using colors.
pub fn print_error_summary(error_stats: &ErrorStats) {
    if !error_stats.has_errors() {
        return;
    }

    println!("  {}", style("Some URLs were rejected:").yellow());

    for (label, urls) in error_stats.groups() {
        if urls.is_empty() {
            continue;
        }
        println!(
            "  {} {} {}{}: {}",
            style("•").dim(),
            urls.len(),
            label,
            plural(urls.len()),
            format_list(urls, 3),
        );
    }
}

// ── Comparison ───────────────────────────────────────────────────────────────

/// Print a table comparing every run, with speedup relative to the first run.
pub fn print_comparison(reports: &[RunReport]) {
    let Some(baseline) = reports.first() else {
        return;
    };

    println!("  {}", style("Comparison").bold());
    println!(
        "  {}",
        style(format!(
            "{}  {}  {}  {}  {}  {}  {}",
            pad_str("Run", 4, Alignment::Left, None),
            pad_str("Concurrency", 11, Alignment::Left, None),
            pad_str("Workers", 7, Alignment::Right, None),
            pad_str("Time", 9, Alignment::Right, None),
            pad_str("Fulfilled", 9, Alignment::Right, None),
            pad_str("Rejected", 8, Alignment::Right, None),
            pad_str("Speedup", 8, Alignment::Right, None),
        ))
        .dim()
    );

    for (i, report) in reports.iter().enumerate() {
        println!(
            "  {}  {}  {}  {}  {}  {}  {}",
            pad_str(&(i + 1).to_string(), 4, Alignment::Left, None),
            pad_str(&report.concurrency, 11, Alignment::Left, None),
            pad_str(&report.workers.to_string(), 7, Alignment::Right, None),
            pad_str(&format_elapsed(report.elapsed), 9, Alignment::Right, None),
            style(pad_str(&report.fulfilled.to_string(), 9, Alignment::Right, None)).green(),
            style(pad_str(&report.rejected.to_string(), 8, Alignment::Right, None)).red(),
            pad_str(
                &format_speedup(baseline.elapsed, report.elapsed),
                8,
                Alignment::Right,
                None
            ),
        );
    }
    println!();
}

// ── Dry run ──────────────────────────────────────────────────────────────────

/// Print the inputs and planned runs without fetching.
pub fn print_dry_run(urls: &[String], planned: &[(ConcurrencyLimit, usize)], parallel: bool) {
    println!(
        "{} {}",
        style("Dry run:").yellow().bold(),
        style(format!("{} URL{}", urls.len(), plural(urls.len()))).bold()
    );

    for url in urls.iter().take(10) {
        println!("  {}", url);
    }
    if urls.len() > 10 {
        println!("  {}", style(format!("... and {} more", urls.len() - 10)).dim());
    }

    println!();
    for (i, (limit, workers)) in planned.iter().enumerate() {
        println!(
            "  Run {}: concurrency {} -> {} {} worker{}",
            i + 1,
            limit,
            workers,
            if parallel { "spawned" } else { "cooperative" },
            plural(*workers),
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Plural suffix for a count.
pub fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Render a JSON value on one line; strings are shown without quotes.
fn format_value(value: &Value) -> String {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    pad_str(&rendered, VALUE_WIDTH, Alignment::Left, Some("..."))
        .trim_end()
        .to_string()
}

fn display_field(field: &str) -> &str {
    if field.is_empty() {
        "(whole document)"
    } else {
        field
    }
}

/// Join at most `max_show` items, noting how many were left out.
fn format_list(items: &[String], max_show: usize) -> String {
    if items.len() <= max_show {
        items.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            items[..max_show].join(", "),
            items.len() - max_show
        )
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

/// How much faster `run` was than `baseline`, e.g. "3.10x".
fn format_speedup(baseline: Duration, run: Duration) -> String {
    if run.is_zero() {
        return "-".to_string();
    }
    format!("{:.2}x", baseline.as_secs_f64() / run.as_secs_f64())
}

// ── Tests ────────────────────────────────────────────────────────────────────
