//! Integration Tests Module
//!
//! End-to-end tests for the Chalkline generation core: streamed plans with
//! early narration, response recovery, narration throttling and configuration.

// Shared providers, synthesizers and tracing setup
mod support;

// Prompt-to-plan pipeline with early narration
mod pipeline_test;

// Streaming plan parser fed the way providers deliver text
mod plan_stream_test;

// Recovery of plans from noisy model output
mod recovery_test;

// Narration rate limiting under load
mod rate_limiter_test;

// Configuration file round-trips
mod config_test;
