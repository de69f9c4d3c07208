use anyhow::{Context, Result};
use redistrict::{io::ProjectFile, ScenarioId};

use crate::commands::load_project;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::BranchArgs) -> Result<()> {
    let mut data = load_project(&args.project)?.into_data()?;

    let id = data.registry.branch_scenario(ScenarioId(args.scenario), &args.name)
        .with_context(|| format!("Failed to branch scenario {}", args.scenario))?;

    ProjectFile::capture(&data)?.save(&args.project)
        .with_context(|| format!("Failed to write project file: {}", args.project.display()))?;
    println!("[branch] scenario {} copied to {id} \"{}\"", args.scenario, args.name);

    Ok(())
}
