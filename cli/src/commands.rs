pub mod branch;
pub mod compare;
pub mod import;
pub mod validate;

use anyhow::{Context, Result};
use redistrict::{io::ProjectFile, Settings};

use crate::cli::Cli;

/// Settings from `--settings`, or the defaults.
pub(crate) fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.settings {
        Some(path) => Settings::from_json_file(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display())),
        None => Ok(Settings::default()),
    }
}

pub(crate) fn load_project(path: &std::path::Path) -> Result<ProjectFile> {
    ProjectFile::load(path).with_context(|| format!("Failed to read project file: {}", path.display()))
}
