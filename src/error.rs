use coverage::CoverageError;

use crate::types::{ElectorateId, FeatureId, ScenarioId, Task};

/// Errors raised by the redistricting engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("geometry error: {0}")]
    Geometry(#[from] CoverageError),

    #[error("data consistency error: {0}")]
    DataConsistency(String),

    #[error("too many dummy electorates required: {needed} needed, {available} available")]
    CapacityExceeded { needed: usize, available: usize },

    #[error("operation was canceled")]
    Canceled,

    #[error("redistrict failed: {0}")]
    AssignmentFailed(String),

    #[error("a scenario named \"{0}\" already exists")]
    NameConflict(String),

    #[error("{layer} is missing the field '{field}'")]
    Schema { layer: String, field: String },

    #[error("unknown district type '{0}'")]
    UnknownDistrictType(String),

    #[error("no quota defined for {0} electorates")]
    MissingQuota(Task),

    #[error("scenario {0} does not exist")]
    UnknownScenario(ScenarioId),

    #[error("electorate {0} does not exist")]
    UnknownElectorate(ElectorateId),

    #[error("feature {0} does not exist")]
    UnknownFeature(FeatureId),

    #[error("'{0}' is not a valid electorate code")]
    InvalidCode(String),

    #[error("the meshblock layer has unsaved edits")]
    EditSessionOpen,

    #[error("projection error: {0}")]
    Projection(String),

    #[error("background worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn schema(layer: &str, field: &str) -> Self {
        Self::Schema { layer: layer.to_string(), field: field.to_string() }
    }

    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        Self::DataConsistency(message.into())
    }
}
