mod registry;

pub use registry::{AssignmentRecord, ScenarioRegistry};
