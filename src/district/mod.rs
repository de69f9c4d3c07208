mod registry;
mod schema;
mod store;

pub use registry::{DistrictRegistry, QUOTA_TOLERANCE};
pub use schema::ElectorateSchema;
pub use store::{DistrictStore, Electorate};
