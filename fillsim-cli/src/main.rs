//! Fillsim CLI: data conversion, simulation runs and file inspection.
//!
//! Commands:
//! - `convert`: ingest a text/CSV bar export and persist it as Parquet
//! - `nest`: export selected columns as nested JSONL or Parquet records
//! - `run`: simulate the orders in a TOML config and write trade reports
//! - `inspect`: print bar count, time range and data quality of a file

mod logging;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use fillsim_core::data::{
    ingest_path, load_records, write_jsonl, write_nested_parquet, write_parquet, IngestOptions,
    NestedRecordBuilder, SyntheticBars,
};
use fillsim_runner::{
    load_bars, run_simulation, write_summary_json, write_trades_csv, write_trades_json,
    SimulationConfig, SimulationResult,
};

#[derive(Parser)]
#[command(
    name = "fillsim",
    about = "Fillsim CLI: bar-by-bar order fill and exit simulation"
)]
struct Cli {
    /// Emit structured JSON logs instead of human-readable output.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a text/CSV bar export and write it as Parquet.
    Convert {
        /// Bar export (.txt or .csv).
        input: PathBuf,

        /// Destination Parquet file.
        output: PathBuf,

        /// Fail on bars whose open/last fall outside high/low.
        #[arg(long, default_value_t = false)]
        reject_insane: bool,
    },
    /// Export selected columns as one nested record per bar.
    Nest {
        /// Bar file (.txt, .csv or .parquet).
        input: PathBuf,

        /// Columns to nest, comma separated (e.g. open,last,volume).
        #[arg(long, required = true, value_delimiter = ',')]
        columns: Vec<String>,

        /// Keep the remaining columns at the top level of each record.
        #[arg(long, default_value_t = false)]
        passthrough: bool,

        /// Destination file: `.parquet` writes a struct column, anything
        /// else writes JSON lines.
        #[arg(long)]
        out: PathBuf,
    },
    /// Simulate the orders described in a TOML config.
    Run {
        /// Path to the simulation config.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for trade reports.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Simulate over N synthetic bars instead of the configured data file.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic bars.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Print bar count, time range and data quality of a bar file.
    Inspect {
        /// Bar file (.txt, .csv or .parquet).
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.json_logs)?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            reject_insane,
        } => run_convert(&input, &output, reject_insane),
        Commands::Nest {
            input,
            columns,
            passthrough,
            out,
        } => run_nest(&input, columns, passthrough, &out),
        Commands::Run {
            config,
            output_dir,
            synthetic,
            seed,
        } => run_simulation_cmd(&config, &output_dir, synthetic, seed),
        Commands::Inspect { file } => run_inspect(&file),
    }
}

fn run_convert(input: &Path, output: &Path, reject_insane: bool) -> Result<()> {
    let opts = IngestOptions {
        reject_insane,
        ..Default::default()
    };
    let report = ingest_path(input, &opts)
        .with_context(|| format!("Failed to ingest {}", input.display()))?;
    write_parquet(output, &report.records)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Converted {} bars: {} -> {}",
        report.records.len(),
        input.display(),
        output.display()
    );
    if report.insane_rows > 0 {
        println!("Insane bars kept: {}", report.insane_rows);
    }
    if !report.dropped_columns.is_empty() {
        println!("Dropped non-numeric columns: {}", report.dropped_columns.join(", "));
    }
    Ok(())
}

fn run_nest(input: &Path, columns: Vec<String>, passthrough: bool, out: &Path) -> Result<()> {
    let report = load_records(input, &IngestOptions::default())
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let builder = NestedRecordBuilder::new(columns).with_passthrough(passthrough);
    if builder.columns().is_empty() {
        bail!("--columns must name at least one column besides the timestamp");
    }
    let nested = builder.build(&report.records)?;
    match NestFormat::from_path(out) {
        NestFormat::Parquet => write_nested_parquet(out, &nested)?,
        NestFormat::Jsonl => write_jsonl(out, &nested)?,
    }

    println!(
        "Wrote {} nested records ({}) to {}",
        nested.len(),
        builder.columns().join(", "),
        out.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NestFormat {
    Jsonl,
    Parquet,
}

impl NestFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") || ext.eq_ignore_ascii_case("pq") => {
                NestFormat::Parquet
            }
            _ => NestFormat::Jsonl,
        }
    }
}

fn run_simulation_cmd(
    config_path: &Path,
    output_dir: &Path,
    synthetic: Option<usize>,
    seed: u64,
) -> Result<()> {
    let config = SimulationConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let bars = match synthetic {
        Some(0) => bail!("--synthetic needs at least one bar"),
        Some(n) => {
            let start = NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .context("invalid synthetic start time")?;
            info!(bars = n, seed, "using synthetic bars");
            SyntheticBars::new(seed, start).generate(n)
        }
        None => load_bars(&config.data)?,
    };

    let result = run_simulation(&config, &bars)?;
    print_summary(&result);

    let run_dir = save_reports(&result, output_dir)?;
    println!("Reports saved to: {}", run_dir.display());
    Ok(())
}

fn save_reports(result: &SimulationResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&result.run_id[..12]);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create {}", run_dir.display()))?;

    write_trades_csv(&run_dir.join("trades.csv"), &result.trades)?;
    write_trades_json(&run_dir.join("trades.json"), &result.trades)?;
    let summary = serde_json::json!({
        "schema_version": result.schema_version,
        "run_id": result.run_id,
        "bar_count": result.bar_count,
        "first_bar": result.first_bar,
        "last_bar": result.last_bar,
        "parallel": result.parallel,
        "summary": result.summary,
    });
    write_summary_json(&run_dir.join("summary.json"), &summary)?;
    Ok(run_dir)
}

fn print_summary(result: &SimulationResult) {
    let s = &result.summary;
    println!("Run: {}", &result.run_id[..12]);
    println!(
        "Bars: {} ({} to {})",
        result.bar_count, result.first_bar, result.last_bar
    );
    println!(
        "Orders: {} total, {} closed, {} open, {} never filled",
        s.total, s.closed, s.open, s.unfilled
    );
    println!("Targets: {}  Stops: {}", s.targets, s.stops);
    println!("Exit PL: {:.4} (avg {:.4})", s.total_exit_pl, s.avg_exit_pl);
    println!("Win rate: {:.1}%", s.win_rate * 100.0);
    if let (Some(worst), Some(best)) = (s.worst_open_pl, s.best_open_pl) {
        println!("Open PL range: {worst:.4} to {best:.4}");
    }
    println!();
    println!(
        "{:<20} {:<6} {:<7} {:<9} {:>12} {:>12} {:>8}",
        "Label", "Side", "Kind", "Status", "Entry", "Exit PL", "Bars"
    );
    println!("{}", "-".repeat(80));
    for t in &result.trades {
        println!(
            "{:<20} {:<6} {:<7} {:<9} {:>12} {:>12} {:>8}",
            t.label,
            t.side.to_string(),
            t.kind,
            format!("{:?}", t.status).to_lowercase(),
            fmt_opt(t.entry_price),
            fmt_opt(t.exit_pl),
            t.bars_live
        );
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn run_inspect(file: &Path) -> Result<()> {
    let report = load_records(file, &IngestOptions::default())
        .with_context(|| format!("Failed to load {}", file.display()))?;

    println!("File: {}", file.display());
    println!("Bars: {}", report.records.len());
    if let (Some(first), Some(last)) = (report.records.first(), report.records.last()) {
        println!("Range: {} to {}", first.bar.timestamp, last.bar.timestamp);
        let extra: Vec<&str> = first.extra.keys().map(String::as_str).collect();
        if !extra.is_empty() {
            println!("Extra columns: {}", extra.join(", "));
        }
    }
    println!("Insane bars: {}", report.insane_rows);
    let void = report.records.iter().filter(|r| r.bar.is_void()).count();
    if void > 0 {
        println!("Void bars: {void}");
    }
    if !report.dropped_columns.is_empty() {
        println!("Dropped columns: {}", report.dropped_columns.join(", "));
    }
    Ok(())
}
