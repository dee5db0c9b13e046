//! Lesson Generation
//!
//! Orchestrates streaming, early narration and recovery for one prompt, and
//! the client that owns the shared narration limiter.

pub mod client;
pub mod session;

pub use client::{ClientState, LessonClient};
pub use session::{GeneratedLesson, GenerationSession};
