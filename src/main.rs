//! Plain-text usage monitor
//!
//! Run with: cargo run -- [--debug] [--plan PLAN] [--config PATH]

use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use usage_ceiling_lib::cli::MonitorArgs;
use usage_ceiling_lib::usage::format::{format_minutes, format_number};
use usage_ceiling_lib::usage::{
    start_monitor, CcusageCommand, Category, MonitorEvent, MonitorReport, UsageEngine,
    UsageSource,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = MonitorArgs::parse();
    usage_ceiling_lib::init_logging(args.debug);

    let config = args.load_config()?;
    log::info!(
        "Monitoring plan {} every {}s",
        Category::parse(&config.plan),
        config.refresh_interval_seconds
    );

    let engine = Arc::new(UsageEngine::with_policy(config.estimator_policy()));
    let source: Arc<dyn UsageSource> = Arc::new(CcusageCommand::new(config.ccusage_command.clone()));

    let (handle, mut events) = start_monitor(engine, source, config);

    while let Some(event) = events.recv().await {
        match event {
            MonitorEvent::Report(report) => println!("{}", render(&report)),
            MonitorEvent::NoActiveSession => println!("No active session found"),
            MonitorEvent::SourceUnavailable(reason) => {
                println!("Failed to get usage data: {}", reason)
            }
        }
    }

    handle.await?;
    Ok(())
}

fn render(report: &MonitorReport) -> String {
    let snap = &report.snapshot;
    let mut out = format!(
        "{}  cost: ${:.2}  burn rate: {:.2}/min  plan: {}\n",
        report.generated_at.with_timezone(&Local).format("%H:%M:%S"),
        report.today_cost.unwrap_or(0.0),
        snap.burn_rate,
        report.category,
    );

    out.push_str(&format!(
        "Usage   {:.1}% ({}/{})\n",
        snap.percent_used,
        format_number(snap.consumed_so_far),
        format_number(snap.ceiling),
    ));
    out.push_str(&format!(
        "Session {:.1}% ({} remaining)\n",
        snap.progress_percent,
        format_minutes(snap.remaining_minutes),
    ));
    out.push_str(&format!(
        "Estimate: {}  Reset: {}  Status: {}",
        snap.projected_depletion_time.with_timezone(&Local).format("%H:%M"),
        snap.session_end_time.with_timezone(&Local).format("%H:%M"),
        snap.status,
    ));

    if report.auto_switched {
        out.push_str(&format!(
            "\nNote: auto-switched to detected plan ({})",
            format_number(snap.ceiling)
        ));
    }
    if let Some(warning) = &report.accuracy_warning {
        out.push('\n');
        out.push_str(warning);
    }

    out
}
