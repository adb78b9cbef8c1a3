//! Forensic Economics CLI
//!
//! Runs one case intake (JSON) through the loss pipeline, prints the ledger
//! and optionally writes the ledger CSV and full JSON report.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use forensic_econ::report::{round_currency, write_ledger_csv_path, write_report_json};
use forensic_econ::{intake, CasePipeline, EngineConfig, InterpolationMode};

/// Wrongful-death economic loss calculator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Case intake file (JSON object or array; CSV also accepted)
    #[arg(short, long)]
    intake: PathBuf,

    /// Reference tables directory, or a JSON reference document
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// Annual discount rate, e.g. 0.035
    #[arg(long)]
    discount_rate: Option<f64>,

    /// Fixed annual wage growth rate (skips the education adjustment)
    #[arg(long)]
    growth_rate: Option<f64>,

    /// Base wage growth rate before the education adjustment
    #[arg(long)]
    base_growth_rate: Option<f64>,

    /// Prorate the first year from the present date to year end
    #[arg(long)]
    prorate_first_year: bool,

    /// Interpolate across gaps between the nearest known table ages
    #[arg(long)]
    bracketing: bool,

    /// Write the ledger as CSV
    #[arg(long)]
    ledger_csv: Option<PathBuf>,

    /// Write the full report (with provenance) as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Write the provenance trail alone as JSON
    #[arg(long)]
    provenance_json: Option<PathBuf>,
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
    if let Some(rate) = cli.base_growth_rate {
        config.base_growth_rate = rate;
    }
    if cli.growth_rate.is_some() {
        config.growth_rate = cli.growth_rate;
    }
    if cli.prorate_first_year {
        config.prorate_first_year = true;
    }
    if cli.bracketing {
        config.interpolation = InterpolationMode::Bracketing;
    }

    println!("Forensic Economics v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let store = config
        .load_tables()
        .with_context(|| format!("loading reference tables from {}", config.tables_dir.display()))?;
    let intakes = intake::load_intakes(&cli.intake)
        .with_context(|| format!("reading intake {}", cli.intake.display()))?;
    let Some(case) = intakes.first() else {
        bail!("intake file {} contains no cases", cli.intake.display());
    };
    if intakes.len() > 1 {
        log::warn!("{} cases in intake; running the first only (use run_batch for all)", intakes.len());
    }

    let pipeline = CasePipeline::new(&store, config.case_assumptions());
    let report = pipeline.run(case)?;

    println!("Case: {}", report.case_id);
    println!("  Name: {}", report.victim.full_name);
    println!("  Age: {}  Sex: {}", report.victim.age, report.victim.sex);
    println!(
        "  Education: {} -> {}",
        report.victim.education, report.worklife.education_tier
    );
    println!("  Salary: ${:.2}", report.victim.annual_salary);
    println!();
    println!(
        "  Remaining life: {:.2} years{}",
        report.life_expectancy.remaining_years,
        if report.life_expectancy.is_fallback { " (fallback)" } else { "" }
    );
    println!(
        "  Worklife: {:.2} years (retirement age {})",
        report.worklife.worklife_years, report.worklife.implied_retirement_age
    );
    println!("  Growth rate: {:.4}  Discount rate: {:.4}", report.growth_rate, report.discount_rate);
    println!();

    println!("{:>4} {:>6} {:>7} {:>14} {:>14} {:>10} {:>14} {:>16}",
        "Year", "Age", "Portion", "Full Year", "Actual", "DF", "PV", "Cumulative PV");
    println!("{}", "-".repeat(92));
    for row in &report.ledger.rows {
        println!("{:>4} {:>6.1} {:>7.4} {:>14.2} {:>14.2} {:>10.6} {:>14.2} {:>16.2}",
            row.year_index,
            row.age,
            row.portion_of_year,
            row.full_year_value,
            row.actual_value,
            row.discount_factor,
            row.present_value,
            row.cumulative_present_value,
        );
    }

    println!("\nSummary:");
    println!("  Years of loss: {:.2}", report.summary.years_of_loss);
    println!("  Total nominal: ${:.2}", round_currency(report.total_nominal));
    println!("  Total present value: ${:.2}", round_currency(report.total_present_value));
    if !report.flags.is_empty() {
        println!("  Flags: {:?}", report.flags);
    }
    println!("\nData sources:");
    for source in &report.data_sources {
        println!("  {} ({})", source.source_name, source.source_url);
    }

    if let Some(path) = &cli.ledger_csv {
        write_ledger_csv_path(&report.ledger, path)
            .with_context(|| format!("writing ledger to {}", path.display()))?;
        println!("\nLedger written to: {}", path.display());
    }
    if let Some(path) = &cli.report_json {
        write_report_json(&report, path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("Report written to: {}", path.display());
    }

    if let Some(path) = &cli.provenance_json {
        report
            .provenance
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Provenance written to: {}", path.display());
    }

    Ok(())
}
