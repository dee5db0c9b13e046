//! Narration
//!
//! Rate-limited speech synthesis for step narration.
//!
//! ## Components
//! - **RateLimiter**: FIFO queue with a sliding-window quota and even spacing
//! - **NarrationDispatcher**: fire-and-forget synthesis through the limiter

pub mod dispatcher;
pub mod rate_limiter;

pub use dispatcher::{
    AudioClip, NarrationDispatcher, NarrationError, NarrationHandle, NarrationRequest,
    SpeechSynthesizer,
};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterError};
