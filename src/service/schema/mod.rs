//! Schema v2.3 coercion and validation
//!
//! Two-phase pipeline over LLM-extracted incident payloads: the coercion
//! engine repairs drift in place and tallies what it fixed, the validator is
//! the strict gate that either constructs a canonical record or reports
//! every violation. Both share the structural pre-normalization step.

pub mod coercion;
pub mod validation;

pub use coercion::{CoercionTally, coerce_payload};
pub use validation::{ValidationReport, build_incident, validate_incident};
