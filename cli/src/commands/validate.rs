use anyhow::{Context, Result};
use redistrict::{DistrictRegistry, ScenarioId};

use crate::commands::{load_project, load_settings};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ValidateArgs) -> Result<()> {
    let settings = load_settings(cli)?;
    let data = load_project(&args.project)?.into_data()?;
    let session = data.into_session(settings, ScenarioId(args.scenario), args.task)
        .with_context(|| format!("Failed to switch to scenario {}", args.scenario))?;

    let quota = session.district_registry().quota_for_type(args.task).ok();
    let mut invalid = 0;
    for electorate in session.districts().electorates()? {
        if electorate.task != args.task { continue }
        let population = electorate.estimated_pop.unwrap_or(0);
        let variation = quota
            .map(|quota| format!("{:+}%", DistrictRegistry::variation_percent(quota, population)))
            .unwrap_or_else(|| String::from("-"));
        let flag = match quota {
            Some(quota) if DistrictRegistry::exceeds_tolerance(quota, population) => "over tolerance",
            _ => "",
        };
        let status = electorate.invalid_reason.as_deref().unwrap_or("ok");
        if electorate.invalid { invalid += 1 }
        println!("{:<6} {:<24} {:>8} {:>6}  {status} {flag}", electorate.code, electorate.name, population, variation);
    }
    println!("[validate] {invalid} invalid electorates");

    Ok(())
}
