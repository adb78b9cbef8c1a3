//! Run every case in an intake file (CSV or JSON) in parallel
//!
//! Outputs one summary row per case, plus optional per-case ledgers

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use forensic_econ::report::{ledger_file_name, write_case_summaries_path, write_ledger_csv_path, CaseSummaryRow};
use forensic_econ::{intake, CasePipeline, EngineConfig};

/// Batch wrongful-death loss calculations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Intake file with many cases
    #[arg(short, long)]
    intake: PathBuf,

    /// Reference tables directory, or a JSON reference document
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// Annual discount rate
    #[arg(long)]
    discount_rate: Option<f64>,

    /// Summary CSV output path
    #[arg(short, long, default_value = "batch_summary.csv")]
    output: PathBuf,

    /// Directory for per-case ledger CSVs
    #[arg(long)]
    ledger_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(path) = cli.tables {
        config.tables_dir = path;
    }
    if let Some(rate) = cli.discount_rate {
        config.discount_rate = rate;
    }

    let start = Instant::now();
    let store = config
        .load_tables()
        .with_context(|| format!("loading reference tables from {}", config.tables_dir.display()))?;
    println!("Loaded reference tables in {:?}", start.elapsed());

    let batch = intake::load_intake_batch(&cli.intake)
        .with_context(|| format!("reading intake {}", cli.intake.display()))?;
    let case_count = batch.len();
    println!("Loaded {} cases in {:?}", case_count, start.elapsed());

    println!("Running cases...");
    let run_start = Instant::now();
    let pipeline = CasePipeline::new(&store, config.case_assumptions());
    let results = pipeline.run_records(batch);
    println!("Cases complete in {:?}", run_start.elapsed());

    if let Some(dir) = &cli.ledger_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for (case_id, report) in results.iter().filter_map(|(id, r)| r.as_ref().ok().map(|r| (id, r))) {
            let path = dir.join(ledger_file_name(case_id));
            write_ledger_csv_path(&report.ledger, &path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    let rows: Vec<CaseSummaryRow> = results
        .iter()
        .map(|(case_id, result)| match result {
            Ok(report) => CaseSummaryRow::from_report(report),
            Err(err) => {
                log::warn!("Case {} failed: {}", case_id, err);
                CaseSummaryRow::from_error(case_id, err)
            }
        })
        .collect();
    write_case_summaries_path(&rows, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    let succeeded: Vec<_> = results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
    let total_pv: f64 = succeeded.iter().map(|r| r.total_present_value).sum();
    let flagged = succeeded.iter().filter(|r| !r.flags.is_empty()).count();

    println!("\nSummary:");
    println!("  Cases: {}", case_count);
    println!("  Succeeded: {}", succeeded.len());
    println!("  Failed: {}", case_count - succeeded.len());
    println!("  Flagged for review: {}", flagged);
    println!("  Total present value: ${:.2}", total_pv);
    println!("\nSummary written to: {}", cli.output.display());
    println!("Total time: {:?}", start.elapsed());

    Ok(())
}
