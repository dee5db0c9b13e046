//! Services
//!
//! Streaming ingestion, recovery, narration and the generation orchestrator.

pub mod generation;
pub mod narration;
pub mod plan_stream;
pub mod recovery;

pub use generation::{GeneratedLesson, GenerationSession, LessonClient};
pub use narration::{NarrationDispatcher, RateLimiter, RateLimiterConfig, SpeechSynthesizer};
pub use plan_stream::{Detection, PlanFieldNames, StreamingPlanParser};
pub use recovery::{parse_plan, recover_json, MalformedResponseError, PlanParseError};
