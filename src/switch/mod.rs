mod scenario;
mod staged;

pub use scenario::{apply_electorate_updates, ElectorateUpdate, ScenarioSwitchTask};
pub use staged::UpdateStagedElectoratesTask;
