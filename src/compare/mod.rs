mod background;
mod comparison;
mod dummy;
mod output;

pub use background::{spawn_comparison, ComparisonHandle};
pub use comparison::{compare_scenarios, ComparisonRequest, ComparisonTask};
pub use dummy::DummyPool;
pub use output::{ChangedArea, ChangedMeshblock, ComparisonOutput};
