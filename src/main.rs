use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use dmp_esoteric::config::{self, Config};
use dmp_esoteric::report::{self, Report};
use dmp_esoteric::{AlbumOutcome, Apply, RepairBackend, Simulate, Validator};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "dmp-esoteric",
    about = "Validate extracted Esoteric DSF albums against their SACD ISO sources"
)]
struct Args {
    /// Source library (SACD ISOs)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Target library (extracted DSF)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Report only, change nothing (default)
    #[arg(long, conflicts_with = "fix")]
    dry_run: bool,

    /// Apply repairs to the target library
    #[arg(long)]
    fix: bool,

    /// Only process albums whose name contains this text (case-insensitive)
    #[arg(long)]
    album: Option<String>,

    /// Where reports and errors.log are written
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

fn build_config(args: &Args) -> Config {
    config::load_env();

    let source = config::resolve_path(args.source.clone(), config::SOURCE_VAR, config::DEFAULT_SOURCE);
    let target = config::resolve_path(args.target.clone(), config::TARGET_VAR, config::DEFAULT_TARGET);

    let mut config = Config::new(source, target);
    config.dry_run = !args.fix;
    config.album_filter = args.album.clone();
    config.report_dir = config::resolve_path(args.report_dir.clone(), config::REPORT_DIR_VAR, ".");
    config
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

fn print_unit(unit: &AlbumOutcome, dry_run: bool, indent: &str) {
    println!("{}{} {}", indent, "[ALBUM]".blue().bold(), unit.name.bright_white());

    let Some(plan) = &unit.plan else {
        return;
    };

    for finding in &plan.findings {
        let line = finding.describe();
        if finding.is_missing_album() || finding.is_missing_disc() {
            println!("{}  {} {}", indent, "[MISSING]".red().bold(), line);
        } else {
            println!("{}  {} {}", indent, "!".yellow(), line.yellow());
        }
    }
    for warning in &plan.warnings {
        println!("{}  {} {}", indent, "!".yellow(), warning.describe().yellow());
    }

    for action in &unit.applied {
        if dry_run {
            println!("{}  {} {}", indent, "[DRY-RUN]".cyan(), action.describe());
        } else {
            println!("{}  {} {}", indent, "[FIXED]".green(), action.describe());
        }
    }
    for failed in &unit.failed {
        println!(
            "{}  {} {}: {}",
            indent,
            "✗".red(),
            failed.action.describe(),
            failed.error.red()
        );
    }

    if plan.ok {
        println!("{}  {} OK", indent, "✓".green());
    }
}

fn print_outcome(outcome: &AlbumOutcome, dry_run: bool) {
    if outcome.skipped {
        println!(
            "{} {} (native DSD)",
            "[SKIP]".bright_black(),
            outcome.name.bright_black()
        );
        return;
    }

    if outcome.is_box_set() {
        println!(
            "{} {} ({} albums)",
            "[BOX SET]".magenta().bold(),
            outcome.name.bright_white(),
            outcome.sub_albums.len()
        );
        for sub in &outcome.sub_albums {
            print_unit(sub, dry_run, "  ");
        }
        return;
    }

    print_unit(outcome, dry_run, "");
}

fn print_summary(report: &Report) {
    println!();
    println!("{}", "=".repeat(60));
    println!("SUMMARY");
    println!("{}", "=".repeat(60));
    for (key, value) in report.summary.rows() {
        let value = value.to_string();
        let value = match key {
            "albums_ok" => value.green(),
            "missing_albums_count" | "missing_discs_count" | "fixes_failed" if value != "0" => {
                value.red()
            }
            "duplicate_discs_count" | "nested_structures_count" if value != "0" => value.yellow(),
            _ => value.normal(),
        };
        println!("  {:<24} {}", key, value);
    }
}

// ---------------------------------------------------------------------------
// Error log
// ---------------------------------------------------------------------------

/// Append one `[VALIDATE]` line per failed fix.
fn append_error_log(report: &Report, report_dir: &Path) -> Result<()> {
    if report.fixes_failed.is_empty() {
        return Ok(());
    }

    let path = report_dir.join("errors.log");
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Cannot open {}", path.display()))?;

    for failed in &report.fixes_failed {
        writeln!(
            f,
            "[VALIDATE] {} - {}: {}",
            failed.album,
            failed.action.describe(),
            failed.error
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn run<B: RepairBackend>(config: Config, backend: B) -> Result<Report> {
    let dry_run = backend.is_dry_run();
    let mut validator = Validator::new(config, backend).context("Invalid configuration")?;
    Ok(validator.run(|outcome| print_outcome(outcome, dry_run)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args);

    println!("DMP Esoteric Validator");
    println!("======================");
    println!("Source: {}", config.source.display());
    println!("Target: {}", config.target.display());
    if config.dry_run {
        println!("Mode: {} (no changes will be made)", "DRY RUN".yellow().bold());
    } else {
        println!("Mode: {}", "FIX".green().bold());
    }
    if let Some(filter) = &config.album_filter {
        println!("Filter: {}", filter);
    }
    println!();

    let report_dir = config.report_dir.clone();
    let report = if config.dry_run {
        run(config, Simulate)?
    } else {
        run(config, Apply)?
    };

    print_summary(&report);

    config::ensure_report_dir(&report_dir)?;
    append_error_log(&report, &report_dir)?;

    let json_path = report::write_json(&report, &report_dir)
        .with_context(|| format!("Cannot write JSON report to {}", report_dir.display()))?;
    let text_path = report::write_text(&report, &report_dir)
        .with_context(|| format!("Cannot write text report to {}", report_dir.display()))?;

    println!();
    println!("{} Reports written:", "✓".green());
    println!("  {} {}", "→".bright_black(), json_path.display());
    println!("  {} {}", "→".bright_black(), text_path.display());

    Ok(())
}
