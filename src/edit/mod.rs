mod audit;
mod queue;

pub use audit::{AuditLog, AuditRow};
pub use queue::{AttributeChanges, ElectorateEditQueue, GeometryChanges, DEFAULT_QUEUE_CAPACITY};
