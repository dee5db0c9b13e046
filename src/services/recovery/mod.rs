//! Response Recovery
//!
//! Turns a finished, possibly noisy generation into a validated plan.
//!
//! ## Components
//! - **JSON recovery**: direct parse, reasoning strip, fenced blocks, last object
//! - **Plan parser**: typed deserialisation and step-count validation

pub mod json_recovery;
pub mod plan_parser;

pub use json_recovery::{
    recover_json, recover_json_detailed, MalformedResponseError, Recovered, RecoveryStage,
};
pub use plan_parser::{parse_plan, parse_plan_with_preview, PlanParseError};
