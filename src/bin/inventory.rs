use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::PathBuf;

use dmp_esoteric::config;
use dmp_esoteric::inventory::{self, InventoryAlbum, InventoryReport};

#[derive(Parser, Debug)]
#[command(
    name = "dmp-esoteric-inventory",
    about = "Inventory Esoteric SACD sources against their extracted DSF copies"
)]
struct Args {
    /// Source library (SACD ISOs)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Target library (extracted DSF)
    #[arg(long)]
    target: Option<PathBuf>,

    /// JSON output file
    #[arg(long, default_value = "esoteric-inventory.json")]
    output: PathBuf,
}

fn print_album(album: &InventoryAlbum) {
    println!("{} {}", "[ALBUM]".blue().bold(), album.name.bright_white());
    for issue in &album.issues {
        println!("  {} {}", "✗".red(), issue.describe());
    }
    for sub in album.sub_albums.iter().filter(|s| !s.issues.is_empty()) {
        println!("  {} {}", "→".bright_black(), sub.name);
        for issue in &sub.issues {
            println!("    {} {}", "✗".red(), issue.describe());
        }
    }
}

fn print_summary(report: &InventoryReport) {
    let s = &report.summary;
    println!();
    println!("{}", "=".repeat(60));
    println!("INVENTORY SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Albums:               {}", s.total_albums);
    println!("  Source discs:         {}", s.total_source_discs);
    println!("  Extracted discs:      {}", s.total_target_discs);
    println!("  Missing extractions:  {}", s.missing_extractions().to_string().red());
    println!("  Complete:             {}", s.albums_complete.to_string().green());
    println!("  Missing discs:        {}", s.albums_missing_discs.to_string().yellow());
    println!("  Missing entirely:     {}", s.albums_missing_entirely.to_string().red());
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
    config::load_env();

    let source = config::resolve_path(args.source, config::SOURCE_VAR, config::DEFAULT_SOURCE);
    let target = config::resolve_path(args.target, config::TARGET_VAR, config::DEFAULT_TARGET);

    println!("DMP Esoteric Inventory");
    println!("======================");
    println!("Source: {}", source.display());
    println!("Target: {}", target.display());
    println!();

    let report = inventory::build(&source, &target).context("Invalid configuration")?;

    let with_issues: Vec<&InventoryAlbum> =
        report.albums.iter().filter(|a| a.has_issues()).collect();
    if with_issues.is_empty() {
        println!("{} Every album is fully extracted", "✓".green());
    }
    for album in with_issues {
        print_album(album);
    }

    print_summary(&report);

    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&args.output, json)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;
    println!();
    println!("{} Inventory written to {}", "✓".green(), args.output.display());

    Ok(())
}
