use anyhow::{Context, Result};
use redistrict::{io::ProjectFile, ScenarioId};

use crate::commands::load_project;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ImportArgs) -> Result<()> {
    let mut data = load_project(&args.project)?.into_data()?;
    let source = load_project(&args.from)?.into_data()?;

    let id = data.registry.import_scenario(&source.registry, ScenarioId(args.scenario), &args.name)
        .with_context(|| format!("Failed to import scenario {} from {}", args.scenario, args.from.display()))?;

    ProjectFile::capture(&data)?.save(&args.project)
        .with_context(|| format!("Failed to write project file: {}", args.project.display()))?;
    println!("[import] scenario {} imported as {id} \"{}\"", args.scenario, args.name);

    Ok(())
}
