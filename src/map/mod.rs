mod crs;
mod layer;
mod schema;

pub use crs::{Crs, ReferencedRect};
pub use layer::{Meshblock, MeshblockLayer};
pub use schema::MeshblockSchema;
