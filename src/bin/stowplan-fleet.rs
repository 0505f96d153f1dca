//! Fleet scheduling demo entrypoint: generates a synthetic fleet and block
//! catalog, runs the scheduler end to end, and reports the outcome.

use std::collections::HashMap;
use std::error::Error;
use std::time::Instant;

use colored::*;
use csv::Writer;
use tracing::{info, span, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stowplan::domain::voyage::VoyageId;
use stowplan::domain::Voyage;
use stowplan::fixtures::{generate_blocks, generate_fleet};
use stowplan::io::{AssignmentResult, VesselUsageSummary};
use stowplan::{Loader, Placer, Scheduler};

const BLOCK_COUNT: usize = 120;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_span_events(fmt::format::FmtSpan::CLOSE).compact())
        .init();

    let fleet_span = span!(Level::INFO, "fleet_run");
    let _guard = fleet_span.enter();

    let vessels = generate_fleet();
    let horizon_start = chrono::Utc::now().date_naive();
    let (mut blocks, mut state) = generate_blocks(BLOCK_COUNT, horizon_start);
    info!(
        blocks = blocks.len(),
        vessels = vessels.len(),
        "synthetic catalog generated"
    );

    let mut voyages: HashMap<VoyageId, Voyage> = HashMap::new();
    let loader = Loader {
        placer: Placer::RotationOptimized,
        vessels: &vessels,
    };
    let scheduler = Scheduler::new(loader);

    let start = Instant::now();
    let report = scheduler.run(&mut blocks, &mut state, &mut voyages);
    let elapsed_ms = start.elapsed().as_millis();

    let result = build_assignment_result(&voyages, &state, &report, &vessels, elapsed_ms);
    print_summary(&result);
    write_usage_csv(&result, "vessel_usage.csv")?;
    write_assignment_json(&result, "assignment_result.json")?;

    Ok(())
}

fn build_assignment_result(
    voyages: &HashMap<VoyageId, Voyage>,
    state: &stowplan::domain::SchedulingState,
    report: &stowplan::ScheduleReport,
    vessels: &HashMap<u32, stowplan::VesselSpec>,
    elapsed_ms: u128,
) -> AssignmentResult {
    let cost_by_name: HashMap<&str, f64> = vessels
        .values()
        .map(|v| (v.name.as_str(), v.voyage_cost))
        .collect();

    let voyage_assignments: HashMap<String, Vec<String>> = voyages
        .values()
        .filter(|v| !v.is_empty())
        .map(|v| (v.voyage_id.clone(), v.blocks.clone()))
        .collect();

    let mut per_vessel: HashMap<String, (usize, usize)> = HashMap::new();
    let mut total_cost_krw = 0.0;
    for voyage in voyages.values().filter(|v| !v.is_empty()) {
        let entry = per_vessel.entry(voyage.vessel_name.clone()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += voyage.blocks.len();
        total_cost_krw += cost_by_name.get(voyage.vessel_name.as_str()).copied().unwrap_or(0.0);
    }

    let usage_summary = per_vessel
        .into_iter()
        .map(|(vessel_name, (voyages_used, blocks_carried))| VesselUsageSummary {
            vessel_name,
            voyages_used,
            blocks_carried,
        })
        .collect();

    let mut logs: Vec<String> = vec![format!("rounds_run={}", report.rounds_run)];
    logs.extend(report.cooldown_violations.iter().map(|v| {
        format!(
            "cooldown_violation vessel={} gap_days={} required={}",
            v.vessel_name, v.gap_days, v.required
        )
    }));

    AssignmentResult {
        voyage_assignments,
        block_assignments: state.block_assignments.clone(),
        unassigned_block_list: report.unassigned.keys().cloned().collect(),
        usage_summary,
        logs,
        total_cost_krw,
        elapsed_ms,
    }
}

fn print_summary(result: &AssignmentResult) {
    let total_blocks = result.block_assignments.len() + result.unassigned_block_list.len();
    let assigned = result.block_assignments.len();
    let rate = if total_blocks == 0 {
        1.0
    } else {
        assigned as f64 / total_blocks as f64
    };

    if result.unassigned_block_list.is_empty() {
        println!(
            "{}",
            format!(
                "All {assigned} blocks assigned across {} voyages ({:.1} ms)",
                result.voyage_assignments.len(),
                result.elapsed_ms
            )
            .green()
        );
    } else {
        println!(
            "{}",
            format!(
                "{assigned}/{total_blocks} blocks assigned ({:.1}% assignment rate), {} left over",
                rate * 100.0,
                result.unassigned_block_list.len()
            )
            .yellow()
        );
    }

    for usage in &result.usage_summary {
        println!(
            "  {}: {} voyages, {} blocks",
            usage.vessel_name, usage.voyages_used, usage.blocks_carried
        );
    }
}

fn write_usage_csv(result: &AssignmentResult, filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(filename)?;
    wtr.write_record(["vessel_name", "voyages_used", "blocks_carried"])?;
    for usage in &result.usage_summary {
        wtr.write_record([
            usage.vessel_name.clone(),
            usage.voyages_used.to_string(),
            usage.blocks_carried.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_assignment_json(result: &AssignmentResult, filename: &str) -> Result<(), Box<dyn Error>> {
    let file = std::fs::File::create(filename)?;
    serde_json::to_writer_pretty(file, result)?;
    Ok(())
}
