//! Recovery Integration Tests
//!
//! Plans recovered from the kinds of noisy output generation backends
//! actually produce. No provider is involved; inputs are literal transcripts.

use chalkline::services::recovery::{recover_json_detailed, RecoveryStage};
use chalkline::{parse_plan, recover_json, PlanParseError};
use serde_json::json;

use crate::support::LEVER_CHUNKS;

// ============================================================================
// Helpers
// ============================================================================

fn lever_plan() -> String {
    LEVER_CHUNKS.concat()
}

// ============================================================================
// Stage selection
// ============================================================================

#[test]
fn test_each_stage_recovers_the_same_plan() {
    let plan = lever_plan();
    let cases = [
        (plan.clone(), RecoveryStage::Direct),
        (format!("  \n{plan}\n  "), RecoveryStage::Direct),
        (
            format!("<thinking>Three steps: {{fulcrum}}, push, load.</thinking>{plan}"),
            RecoveryStage::ReasoningStripped,
        ),
        (
            format!("Sure {{!}}\n```json\n{plan}\n```\nAnything else {{?}}"),
            RecoveryStage::FencedBlock,
        ),
        (format!("Here you go: {plan}"), RecoveryStage::LastObject),
    ];

    let expected: serde_json::Value = serde_json::from_str(&plan).unwrap();
    for (input, stage) in cases {
        let recovered = recover_json_detailed(&input, 200).unwrap();
        assert_eq!(recovered.stage, stage, "input: {input}");
        assert_eq!(recovered.value, expected);
    }
}

#[test]
fn test_think_block_containing_json_is_ignored() {
    let text = r#"<think>Draft: {"explanation":"draft","whiteboard":[]}</think>
Final answer: {"explanation":"final","whiteboard":[{"origin":{"x":0,"y":0},"explanation":"go"}]}"#;
    let plan = parse_plan(text).unwrap();
    assert_eq!(plan.explanation, "final");
}

#[test]
fn test_last_object_example() {
    let value = recover_json(r#"noise {{{ "explanation":"x","whiteboard":[]}"#).unwrap();
    assert_eq!(value, json!({"explanation": "x", "whiteboard": []}));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_degenerate_inputs_fail_with_context() {
    for input in ["", "   ", "no json at all", "{", "}", "{ \"a\": "] {
        let err = recover_json(input).unwrap_err();
        assert_eq!(err.input_len, input.len());
        assert!(err.preview.len() <= 200);
    }
}

#[test]
fn test_idempotent() {
    let inputs = [
        lever_plan(),
        format!("```json\n{}\n```", lever_plan()),
        "garbage {".to_string(),
    ];
    for input in &inputs {
        let first = recover_json(input);
        for _ in 0..3 {
            assert_eq!(recover_json(input), first);
        }
    }
}

#[test]
fn test_plan_errors_are_typed() {
    assert!(matches!(
        parse_plan("nothing here"),
        Err(PlanParseError::Malformed(_))
    ));
    assert!(matches!(
        parse_plan(r#"{"whiteboard": "not a list", "explanation": ""}"#),
        Err(PlanParseError::Schema(_))
    ));
    assert!(matches!(
        parse_plan(r#"```json
{"explanation": "empty", "whiteboard": []}
```"#),
        Err(PlanParseError::EmptyWhiteboard)
    ));
}

#[test]
fn test_dangling_highlight_does_not_fail_parse() {
    let text = r#"{"explanation":"x","whiteboard":[{"origin":{"x":0,"y":0},"explanation":"a","highlightIds":["missing"]}]}"#;
    let plan = parse_plan(text).unwrap();
    assert_eq!(plan.dangling_references().len(), 1);
}
