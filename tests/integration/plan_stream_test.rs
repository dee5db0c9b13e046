//! Streaming Plan Parser Integration Tests
//!
//! Feeds the parser exactly what a provider transport would: fragments coming
//! out of the chat-completions adapter, split at awkward points.

use chalkline::{parse_plan, StreamingPlanParser};
use chalkline_core::StreamAdapter;
use chalkline_llm::ChatCompletionsAdapter;

use crate::support::LEVER_CHUNKS;

fn sse_line(content: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

#[test]
fn test_adapter_fragments_detect_once_and_recover() {
    let mut adapter = ChatCompletionsAdapter::new("test");
    let mut parser = StreamingPlanParser::new();
    let mut detections = Vec::new();

    let mut lines: Vec<String> = vec![sse_line("<think>plan three steps</think>")];
    lines.extend(LEVER_CHUNKS.iter().map(|c| sse_line(c)));
    lines.push("data: [DONE]".to_string());

    for line in &lines {
        for event in adapter.adapt(line).unwrap() {
            if let Some(text) = event.text() {
                let detection = parser.feed(text);
                if detection.detected {
                    detections.push(detection.explanation.unwrap());
                }
            }
        }
    }

    assert_eq!(detections, vec!["This is the \"pivot\".".to_string()]);
    let plan = parse_plan(parser.accumulated_text()).unwrap();
    assert_eq!(plan.whiteboard.len(), 3);
    assert_eq!(plan.narration(0), Some("This is the \"pivot\"."));
}

#[test]
fn test_every_split_point_detects_same_value() {
    let full: String = LEVER_CHUNKS.concat();
    let expected = Some("This is the \"pivot\".".to_string());

    for split in (1..full.len()).filter(|i| full.is_char_boundary(*i)) {
        let mut parser = StreamingPlanParser::new();
        let first = parser.feed(&full[..split]);
        let second = parser.feed(&full[split..]);

        assert!(
            first.detected ^ second.detected,
            "expected exactly one detection at split {split}"
        );
        let found = if first.detected {
            first.explanation
        } else {
            second.explanation
        };
        assert_eq!(found, expected, "split {split}");
        assert_eq!(parser.accumulated_text(), full);
    }
}

#[test]
fn test_no_detection_before_closing_quote() {
    let full: String = LEVER_CHUNKS.concat();
    let closing = full.find(r#"\"pivot\"."#).unwrap() + r#"\"pivot\"."#.len();

    let mut parser = StreamingPlanParser::new();
    assert!(!parser.feed(&full[..closing]).detected);
    assert!(parser.feed(&full[closing..closing + 1]).detected);
}
