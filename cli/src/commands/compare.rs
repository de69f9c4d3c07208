use anyhow::{bail, Context, Result};
use geo::{coord, Rect};
use redistrict::{
    io::write_comparison, spawn_comparison, ComparisonRequest, Crs, ReferencedRect, ScenarioId,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

use crate::commands::{load_project, load_settings};

fn extent(args: &crate::cli::CompareArgs) -> Result<Option<ReferencedRect>> {
    let Some(values) = &args.extent else { return Ok(None) };
    let [min_x, min_y, max_x, max_y] = values.as_slice() else {
        bail!("--extent needs exactly four values, got {}", values.len())
    };
    let rect = Rect::new(coord! { x: *min_x, y: *min_y }, coord! { x: *max_x, y: *max_y });
    Ok(Some(ReferencedRect::new(rect, Crs(args.extent_epsg))))
}

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::CompareArgs) -> Result<()> {
    let settings = load_settings(cli)?;
    let out_path = args.output.clone().unwrap_or_else(|| PathBuf::from("./comparison.json"));
    let data = load_project(&args.project)?.into_data()
        .with_context(|| format!("Invalid project: {}", args.project.display()))?;

    let request = ComparisonRequest {
        task: args.task,
        base_scenario: ScenarioId(args.base),
        secondary_scenario: ScenarioId(args.secondary),
        extent: extent(args)?,
    };
    info!("comparing scenarios {} and {} for {}", args.base, args.secondary, args.task);
    let handle = spawn_comparison(Arc::new(data.registry), Arc::new(data.meshblocks), request, &settings)?;
    while !handle.is_finished() {
        if cli.verbose > 0 { eprintln!("[compare] {:.0}%", handle.progress()) }
        std::thread::sleep(Duration::from_millis(200));
    }
    let output = handle.join().context("Scenario comparison failed")?;

    println!(
        "[compare] {} changed meshblocks in {} areas ({} unassigned, {} skipped)",
        output.changed.len(), output.changed_areas.len(), output.unassigned.len(), output.skipped.len(),
    );
    write_comparison(&out_path, &output)
        .with_context(|| format!("Failed to write comparison: {}", out_path.display()))?;
    println!("[compare] wrote {}", out_path.display());

    Ok(())
}
