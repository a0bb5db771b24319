//! Incident Schema v2.3 normalization and validation
//!
//! Turns noisy LLM-extracted incident JSON into validated canonical records
//! for bowtie risk analytics. The coercion engine repairs field drift in
//! place and tallies every repair, the structural validator accepts or
//! rejects with precise dotted-path errors, and the batch driver applies
//! both across a corpus directory.

pub mod cli;
pub mod model;
pub mod service;
