//! Pipeline tests
//!
//! End-to-end runs of the orchestrator over in-memory collaborators:
//! - Block sizing and timestamps
//! - Encoder flush and trailer
//! - Release of every collaborator on success and on failure

pub mod pipeline;
