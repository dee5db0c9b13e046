//! Data Models
//!
//! The lesson plan exchanged with renderers and the persisted settings.

pub mod plan;
pub mod settings;

pub use plan::{
    AnnotationCommand, DanglingReference, DrawCommand, Plan, Point, ShapeStyle, Step,
};
pub use settings::{AppConfig, GenerationSettings, NarrationSettings, SettingsUpdate};
