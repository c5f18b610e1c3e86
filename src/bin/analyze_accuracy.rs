//! Ceiling estimation accuracy report
//!
//! Run with: cargo run --bin analyze_accuracy -- [--blocks FILE] [--method METHOD]
//!
//! Reads `ccusage blocks --json` output from `--blocks`, or runs ccusage when
//! no file is given. `--method` selects the per-item summary
//! (median, mode, avg, pNN, trimNN).

use clap::Parser;
use usage_ceiling_lib::cli::AccuracyArgs;
use usage_ceiling_lib::usage::accuracy::per_item_by_method;
use usage_ceiling_lib::usage::format::format_number;
use usage_ceiling_lib::usage::reader::parse_blocks;
use usage_ceiling_lib::usage::{
    analyze_accuracy, per_item_variance, AccuracyAnalysis, CcusageCommand, CeilingEstimator,
    UsageSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AccuracyArgs::parse();
    usage_ceiling_lib::init_logging(args.debug);

    let blocks = match &args.blocks {
        Some(path) => parse_blocks(&std::fs::read(path)?)?,
        None => CcusageCommand::new(args.ccusage_command.clone()).fetch_intervals()?,
    };
    let method = args.method;

    let estimator = CeilingEstimator::default();

    println!("Ceiling Estimation Accuracy Analysis");
    println!("====================================");
    for plan in ["pro", "max5", "max20"] {
        print_analysis(&analyze_accuracy(plan, &blocks, &estimator));
    }

    println!("Per-Item Variance Analysis");
    println!("==========================");
    match per_item_variance(&blocks) {
        None => println!("No data available for analysis"),
        Some(v) => {
            println!("├─ Minimum: {:.1} per item", v.min);
            println!("├─ Maximum: {:.1} per item", v.max);
            println!("├─ Average: {:.1} per item", v.average);
            println!(
                "├─ {}: {}",
                method.label(),
                per_item_by_method(&blocks, method)
            );
            println!("└─ Variance Range: {:.1}x\n", v.range);

            if v.is_high() {
                println!("High variance (>3x) in per-item usage: history-based estimation is preferable");
            } else {
                println!("Moderate variance: reference and history-based estimates should agree");
            }
        }
    }

    Ok(())
}

fn print_analysis(a: &AccuracyAnalysis) {
    println!("Plan: {}", a.category);
    println!("├─ Sample Size: {} sessions", a.sample_size);
    println!("├─ Actual 95th Percentile: {}", format_number(a.actual_p95));
    println!("├─ Estimated Ceiling: {}", format_number(a.estimated_ceiling));
    println!("├─ Accuracy: {:.1}%", a.accuracy_percent);
    println!("├─ Avg Per Item: {}", a.average_per_item);
    println!("└─ Std Deviation: {:.0}\n", a.std_deviation);
}
