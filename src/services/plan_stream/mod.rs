//! Plan Streaming
//!
//! Incremental scanning of a lesson plan while it is still being generated.

pub mod parser;

pub use parser::{Detection, PlanFieldNames, StreamingPlanParser};
