mod electorate;
mod handler;

pub use electorate::{ElectorateRedistrictHandler, RedistrictStores};
pub use handler::RedistrictHandler;
