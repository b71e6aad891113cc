//! Survey-to-parameter derivation for the stakeholder adoption model.
//!
//! Raw ordinal answer counts go in through an [`AnswerStore`]; adoption and
//! abandonment propensities, relation profiles, one-directional and
//! bidirectional relation scores and per-product aggregates come out through a
//! [`TableSink`].
//!
//! [`AnswerStore`]: workflows::answers::AnswerStore
//! [`TableSink`]: workflows::tables::TableSink

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
