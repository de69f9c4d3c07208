use std::path::PathBuf;

use redistrict::Task;

/// Redistricting CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "redistrict", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Engine settings file (JSON); defaults apply when omitted
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Compare two scenarios and write the changed areas
    Compare(CompareArgs),

    /// Copy a scenario under a new name (rewrites the project)
    Branch(BranchArgs),

    /// Copy a scenario from another project (rewrites the project)
    Import(ImportArgs),

    /// Recompute electorates for a scenario and report their populations
    Validate(ValidateArgs),
}

#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    /// Project file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub project: PathBuf,

    /// District type: GN, GS or M
    #[arg(short, long)]
    pub task: Task,

    /// Base scenario id
    #[arg(long)]
    pub base: i64,

    /// Secondary scenario id
    #[arg(long)]
    pub secondary: i64,

    /// Narrow changed areas to this extent: minx,miny,maxx,maxy
    #[arg(long, value_delimiter = ',', num_args = 4)]
    pub extent: Option<Vec<f64>>,

    /// EPSG code of the extent coordinates
    #[arg(long, default_value_t = 4326)]
    pub extent_epsg: u32,

    /// Output file, defaults to "./comparison.json"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct BranchArgs {
    /// Project file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub project: PathBuf,

    /// Scenario to copy
    #[arg(short, long)]
    pub scenario: i64,

    /// Name of the new scenario
    #[arg(short, long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Project file receiving the scenario
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub project: PathBuf,

    /// Project file holding the scenario
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub from: PathBuf,

    /// Scenario id in the source project
    #[arg(short, long)]
    pub scenario: i64,

    /// Name of the imported scenario
    #[arg(short, long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Project file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub project: PathBuf,

    /// Scenario id
    #[arg(short, long)]
    pub scenario: i64,

    /// District type: GN, GS or M
    #[arg(short, long)]
    pub task: Task,
}
