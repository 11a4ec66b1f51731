//! Algorithms module for Edition Assignment
//!
//! Contains:
//! - Candidate number sequencing around reserved numbers
//! - The assignment planner

pub mod assigner;
pub mod candidates;

pub use assigner::plan_assignment;
pub use candidates::CandidateSequence;
