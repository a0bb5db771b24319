pub mod batch;
pub mod schema;

pub use batch::{BatchError, CheckSummary, ConvertSummary, GateSummary};
pub use schema::{CoercionTally, ValidationReport, build_incident, coerce_payload, validate_incident};
