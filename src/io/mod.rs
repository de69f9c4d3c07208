pub mod geojson;
mod output;
mod project;

pub use output::{comparison_to_json, write_comparison};
pub use project::{ElectorateEntry, ProjectData, ProjectFile, ScenarioEntry};
