#![doc = "Redistricting public API: scenarios, comparisons and electorate edit history"]
mod compare;
mod concordance;
mod config;
mod control;
mod district;
mod edit;
mod error;
mod map;
mod redistrict;
mod scenario;
mod session;
mod store;
mod switch;
mod types;

pub mod io;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use types::{ElectorateId, FeatureId, MeshblockNumber, ScenarioId, Task, Value};

#[doc(inline)]
pub use config::Settings;

#[doc(inline)]
pub use control::TaskControl;

#[doc(inline)]
pub use concordance::{deformat_electorate_id, format_electorate_id, format_meshblock_number, ConcordanceItem, PopulationRow};

#[doc(inline)]
pub use map::{Crs, Meshblock, MeshblockLayer, MeshblockSchema, ReferencedRect};

#[doc(inline)]
pub use store::{EditBuffer, Feature, FeatureEditor, FeatureTable};

#[doc(inline)]
pub use scenario::{AssignmentRecord, ScenarioRegistry};

#[doc(inline)]
pub use district::{DistrictRegistry, DistrictStore, Electorate, ElectorateSchema, QUOTA_TOLERANCE};

#[doc(inline)]
pub use edit::{AttributeChanges, AuditLog, AuditRow, ElectorateEditQueue, GeometryChanges, DEFAULT_QUEUE_CAPACITY};

#[doc(inline)]
pub use redistrict::{ElectorateRedistrictHandler, RedistrictHandler, RedistrictStores};

#[doc(inline)]
pub use compare::{
    compare_scenarios, spawn_comparison, ChangedArea, ChangedMeshblock, ComparisonHandle,
    ComparisonOutput, ComparisonRequest, ComparisonTask, DummyPool,
};

#[doc(inline)]
pub use switch::{apply_electorate_updates, ElectorateUpdate, ScenarioSwitchTask, UpdateStagedElectoratesTask};

#[doc(inline)]
pub use session::RedistrictingSession;

#[doc(inline)]
pub use coverage::{point_on_surface, regions, union_coverage, CoverageError, PreparedIndex, UnionOptions};
