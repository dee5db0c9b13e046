//! Chalkline - Lesson Generation Core
//!
//! Streams a multi-step whiteboard plan from a generation backend, starts
//! narrating the first step before the plan has finished, recovers the full
//! plan from noisy output and throttles speech synthesis under a quota.
//! It includes:
//! - Plan and settings models
//! - Streaming plan parser, JSON recovery and narration services
//! - Configuration storage and utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use models::plan::{Plan, Step};
pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::generation::{GeneratedLesson, GenerationSession, LessonClient};
pub use services::narration::{
    AudioClip, NarrationDispatcher, NarrationError, NarrationHandle, NarrationRequest,
    RateLimiter, RateLimiterConfig, RateLimiterError, SpeechSynthesizer,
};
pub use services::plan_stream::{Detection, PlanFieldNames, StreamingPlanParser};
pub use services::recovery::{
    parse_plan, recover_json, MalformedResponseError, PlanParseError, RecoveryStage,
};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
