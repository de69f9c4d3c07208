mod ids;
mod task;
mod value;

pub use ids::{ElectorateId, FeatureId, MeshblockNumber, ScenarioId};
pub use task::Task;
pub use value::Value;
