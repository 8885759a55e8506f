//! Customer Value CLI
//!
//! Command-line interface for purchase summaries, segmentation and
//! customer lifetime value projections

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use customer_value::purchases::{load_purchases, loader::DATE_FORMAT, yearly_activity, PERIOD_DAYS};
use customer_value::{ClvModel, ClvReport, ModelConfig, PeriodInputs, PurchaseAggregator};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "clv")]
#[command(about = "Customer segment projection and lifetime value")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Purchase count, average and total amount per year
    Summary {
        /// Tab-separated purchase file
        #[arg(short, long, default_value = customer_value::purchases::loader::DEFAULT_PURCHASES_PATH)]
        purchases: PathBuf,
    },

    /// Segment customers and profile each segment
    Segments {
        #[arg(short, long, default_value = customer_value::purchases::loader::DEFAULT_PURCHASES_PATH)]
        purchases: PathBuf,

        /// Date the segmentation is computed at (YYYY-MM-DD)
        #[arg(short, long)]
        reference_date: String,

        /// Segment as of this many days before the reference date
        #[arg(long, default_value_t = 0)]
        offset_days: i64,

        /// Model config (JSON) providing segmentation thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Project segment populations and value the customer base
    Project {
        #[arg(short, long, default_value = customer_value::purchases::loader::DEFAULT_PURCHASES_PATH)]
        purchases: PathBuf,

        /// End of the most recent period (YYYY-MM-DD)
        #[arg(short, long)]
        reference_date: String,

        /// Model config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overrides the configured discount rate
        #[arg(long)]
        discount_rate: Option<f64>,

        /// Overrides the configured number of projected periods
        #[arg(long)]
        horizon: Option<usize>,

        /// Additional discount rates to value, comma-separated
        #[arg(long, value_delimiter = ',')]
        scenario_rates: Vec<f64>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Write the per-period table to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Summary { purchases } => run_summary(&purchases),
        Commands::Segments { purchases, reference_date, offset_days, config } => {
            let config = load_config(config.as_deref())?;
            run_segments(&purchases, &reference_date, offset_days, &config)
        }
        Commands::Project {
            purchases,
            reference_date,
            config,
            discount_rate,
            horizon,
            scenario_rates,
            json,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(rate) = discount_rate {
                config.discount_rate = rate;
            }
            if let Some(horizon) = horizon {
                config.horizon = horizon;
            }
            run_project(&purchases, &reference_date, config, &scenario_rates, json, output.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ModelConfig> {
    match path {
        Some(path) => ModelConfig::from_json_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ModelConfig::default()),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("Invalid reference date '{}', expected YYYY-MM-DD", value))
}

fn run_summary(path: &Path) -> Result<()> {
    let purchases = load_purchases(path)
        .with_context(|| format!("Failed to load purchases from {}", path.display()))?;

    println!("{:>6} {:>10} {:>12} {:>14}", "Year", "Purchases", "AvgAmount", "TotalAmount");
    println!("{}", "-".repeat(45));
    for year in yearly_activity(&purchases) {
        println!(
            "{:>6} {:>10} {:>12.2} {:>14.2}",
            year.year, year.purchases, year.average_amount, year.total_amount
        );
    }
    Ok(())
}

fn run_segments(path: &Path, reference_date: &str, offset_days: i64, config: &ModelConfig) -> Result<()> {
    let reference_date = parse_date(reference_date)?;
    config.validate()?;
    let purchases = load_purchases(path)
        .with_context(|| format!("Failed to load purchases from {}", path.display()))?;

    let summaries = PurchaseAggregator::new(&purchases, reference_date).customer_summaries(offset_days);
    let assignments = config.segmentation.assign(&summaries)?;
    let catalog = assignments.catalog();

    // Mean recency, frequency and amount per segment
    let mut totals = vec![(0.0, 0.0, 0.0); catalog.len()];
    for summary in &summaries {
        if let Some(segment) = assignments.get(summary.customer_id) {
            let t = &mut totals[segment.index()];
            t.0 += summary.recency as f64;
            t.1 += summary.frequency as f64;
            t.2 += summary.amount;
        }
    }

    println!("Segments as of {} ({} customers)", reference_date, assignments.len());
    println!("{:<20} {:>8} {:>10} {:>10} {:>10}", "Segment", "Count", "Recency", "Frequency", "Amount");
    println!("{}", "-".repeat(62));
    for (id, count) in catalog.ids().zip(assignments.counts()) {
        let (r, f, a) = totals[id.index()];
        let n = count.max(1) as f64;
        println!(
            "{:<20} {:>8} {:>10.1} {:>10.2} {:>10.2}",
            catalog.label_of(id),
            count,
            r / n,
            f / n,
            a / n
        );
    }
    Ok(())
}

fn run_project(
    path: &Path,
    reference_date: &str,
    config: ModelConfig,
    scenario_rates: &[f64],
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let reference_date = parse_date(reference_date)?;
    let model = ClvModel::new(config)?;

    let purchases = load_purchases(path)
        .with_context(|| format!("Failed to load purchases from {}", path.display()))?;
    let inputs = PeriodInputs::from_purchases(&purchases, reference_date, &model.config().segmentation)?;
    let report = model.run_with_scenarios(&inputs, scenario_rates)?;

    // Period 0 covers the year ending at the reference date
    let base_year = (reference_date - chrono::Duration::days(PERIOD_DAYS)).year();

    if let Some(output) = output {
        write_report_csv(&report, base_year, output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!("Per-period results written to: {}", output.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, base_year);

    if !report.scenarios.is_empty() {
        println!("\nDiscount rate scenarios:");
        for scenario in &report.scenarios {
            println!(
                "  {:>6.2}%  customer base value {:>14.2}",
                scenario.discount_rate * 100.0,
                scenario.revenue.customer_base_value
            );
        }
    }
    Ok(())
}

fn print_report(report: &ClvReport, base_year: i32) {
    println!("Transition matrix:");
    print!("{:<20}", "");
    for (i, _) in report.segments.iter().enumerate() {
        print!(" {:>7}", format!("[{}]", i));
    }
    println!();
    for (label, row) in report.segments.iter().zip(&report.transition) {
        print!("{:<20}", label);
        for p in row {
            print!(" {:>7.3}", p);
        }
        println!();
    }

    println!("\nProjected segment populations:");
    print!("{:<20}", "Segment");
    for period in 0..report.populations.len() {
        print!(" {:>8}", base_year + period as i32);
    }
    println!();
    for (i, label) in report.segments.iter().enumerate() {
        print!("{:<20}", label);
        for population in &report.populations {
            print!(" {:>8.0}", population[i]);
        }
        println!();
    }

    println!("\nRevenue:");
    println!(
        "{:>6} {:>14} {:>14} {:>10} {:>14} {:>14}",
        "Year", "Yearly", "Cumulative", "Discount", "DiscYearly", "DiscCumul"
    );
    println!("{}", "-".repeat(78));
    let revenue = &report.revenue;
    for i in 0..revenue.yearly.len() {
        println!(
            "{:>6} {:>14.0} {:>14.0} {:>10.4} {:>14.0} {:>14.0}",
            base_year + i as i32,
            revenue.yearly[i],
            revenue.cumulative[i],
            revenue.discount_factors[i],
            revenue.discounted[i],
            revenue.discounted_cumulative[i],
        );
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    println!("\nCustomer base value: {:.2}", report.customer_base_value());
}

fn write_report_csv(report: &ClvReport, base_year: i32, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["period".to_string(), "year".to_string()];
    header.extend(report.segments.iter().cloned());
    header.extend(
        ["total", "yearly_revenue", "cumulative_revenue", "discount_factor", "discounted_revenue", "discounted_cumulative_revenue"]
            .iter()
            .map(|s| s.to_string()),
    );
    writer.write_record(&header)?;

    let revenue = &report.revenue;
    for (i, population) in report.populations.iter().enumerate() {
        let mut record = vec![i.to_string(), (base_year + i as i32).to_string()];
        record.extend(population.iter().map(|p| format!("{:.6}", p)));
        record.push(format!("{:.6}", population.iter().sum::<f64>()));
        record.push(format!("{:.6}", revenue.yearly[i]));
        record.push(format!("{:.6}", revenue.cumulative[i]));
        record.push(format!("{:.8}", revenue.discount_factors[i]));
        record.push(format!("{:.6}", revenue.discounted[i]));
        record.push(format!("{:.6}", revenue.discounted_cumulative[i]));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
