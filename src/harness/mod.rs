// src/harness/mod.rs

//! Scenario drivers that exercise a server's transaction isolation through the
//! exec protocol.

pub mod isolation;
pub mod report;

pub use isolation::{IsolationScenario, SeedRow, run_against};
pub use report::{CheckKind, CheckOutcome, Observation, Phase, ScenarioReport};
