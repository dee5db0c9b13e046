//! Lesson Plan Models
//!
//! The plan is the single hand-off unit between generation and rendering. It is
//! deserialised once from the recovered JSON and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A point in the whiteboard coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Stroke and fill shared by every shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

/// A shape to draw, relative to the step origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DrawCommand {
    Circle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        center: Point,
        radius: f64,
        #[serde(default)]
        style: ShapeStyle,
    },
    Rectangle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        style: ShapeStyle,
    },
    Path {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        points: Vec<Point>,
        #[serde(default)]
        closed: bool,
        #[serde(default)]
        style: ShapeStyle,
    },
}

impl DrawCommand {
    pub fn id(&self) -> Option<&str> {
        match self {
            DrawCommand::Circle { id, .. }
            | DrawCommand::Rectangle { id, .. }
            | DrawCommand::Path { id, .. } => id.as_deref(),
        }
    }
}

/// Text and markup layered over the drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationCommand {
    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        position: Point,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Arrow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        from: Point,
        to: Point,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Strikethrough {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Element being struck out
        target_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
}

impl AnnotationCommand {
    pub fn id(&self) -> Option<&str> {
        match self {
            AnnotationCommand::Text { id, .. }
            | AnnotationCommand::Arrow { id, .. }
            | AnnotationCommand::Strikethrough { id, .. } => id.as_deref(),
        }
    }
}

/// One narrated, drawable unit of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub origin: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    /// Narration for this step
    pub explanation: String,
    #[serde(default)]
    pub drawing_plan: Vec<DrawCommand>,
    #[serde(default)]
    pub annotations: Vec<AnnotationCommand>,
    /// Ids of earlier or current elements to highlight (lookup only)
    #[serde(default)]
    pub highlight_ids: BTreeSet<String>,
    /// Ids of labels that stay visible after this step (lookup only)
    #[serde(default)]
    pub retained_label_ids: BTreeSet<String>,
}

impl Step {
    /// Ids of elements introduced by this step.
    pub fn introduced_ids(&self) -> impl Iterator<Item = &str> {
        self.drawing_plan
            .iter()
            .filter_map(DrawCommand::id)
            .chain(self.annotations.iter().filter_map(AnnotationCommand::id))
    }
}

/// The full multi-step lesson returned by the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Overview narration
    pub explanation: String,
    /// Steps in playback order
    pub whiteboard: Vec<Step>,
}

/// A highlight or retained-label id that names no known element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub step_index: usize,
    pub id: String,
}

impl Plan {
    /// Narration for step `index`, if present.
    pub fn narration(&self, index: usize) -> Option<&str> {
        self.whiteboard.get(index).map(|s| s.explanation.as_str())
    }

    /// References that do not resolve to an element introduced in the same or
    /// an earlier step. Generators occasionally invent ids; renderers skip them.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut known: HashSet<&str> = HashSet::new();
        let mut dangling = Vec::new();

        for (step_index, step) in self.whiteboard.iter().enumerate() {
            known.extend(step.introduced_ids());
            for id in step.highlight_ids.iter().chain(&step.retained_label_ids) {
                if !known.contains(id.as_str()) {
                    dangling.push(DanglingReference {
                        step_index,
                        id: id.clone(),
                    });
                }
            }
        }

        dangling
    }
}
