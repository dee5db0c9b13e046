//! Robust JSON Recovery
//!
//! Extracts the single intended JSON object from a finished generation blob.
//! Backends wrap their answer in markdown fences, prepend visible reasoning, or
//! surround it with free text; the strategies below are tried in order and the
//! first successful parse wins.
//!
//! Recovery is a pure function of its input: no I/O, no shared state.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Characters of the input kept in error previews.
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Recovery stages, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    /// Parse the whole blob
    Direct,
    /// Parse after removing `<think>`/`<thinking>` blocks
    ReasoningStripped,
    /// Parse the content of a markdown code fence
    FencedBlock,
    /// Parse the last brace-balanced object
    LastObject,
}

impl fmt::Display for RecoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStage::Direct => write!(f, "direct"),
            RecoveryStage::ReasoningStripped => write!(f, "reasoning_stripped"),
            RecoveryStage::FencedBlock => write!(f, "fenced_block"),
            RecoveryStage::LastObject => write!(f, "last_object"),
        }
    }
}

/// All recovery strategies failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Malformed response: {stage} stage failed ({reason}); {input_len} bytes, starts with {preview:?}")]
pub struct MalformedResponseError {
    /// The last stage attempted
    pub stage: RecoveryStage,
    /// Why that stage failed
    pub reason: String,
    /// Length of the original input in bytes
    pub input_len: usize,
    /// Leading characters of the original input
    pub preview: String,
}

/// A successfully recovered object and the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: Value,
    pub stage: RecoveryStage,
}

fn reasoning_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?s)<think>.*?</think>").expect("valid think pattern"),
            Regex::new(r"(?s)<thinking>.*?</thinking>").expect("valid thinking pattern"),
        ]
    })
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("valid fence pattern")
    })
}

/// Remove every `<think>…</think>` and `<thinking>…</thinking>` block.
pub fn strip_reasoning(text: &str) -> String {
    let [think, thinking] = reasoning_patterns();
    let stripped = think.replace_all(text, "");
    thinking.replace_all(&stripped, "").into_owned()
}

/// Inner contents of every markdown code fence, in order of appearance.
pub fn fenced_blocks(text: &str) -> Vec<&str> {
    fence_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

/// Slice of the outermost object that closes at the last `}` in `text`.
///
/// Scans backwards from the last `}` counting `}` as +1 and `{` as -1 until
/// the depth returns to zero. Braces inside string literals are counted too;
/// the model's answer is assumed to be the final top-level object.
pub fn last_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let end = bytes.iter().rposition(|&b| b == b'}')?;

    let mut depth = 0usize;
    for i in (0..=end).rev() {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[i..=end]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(candidate: &str) -> Result<Value, String> {
    serde_json::from_str::<Value>(candidate.trim()).map_err(|e| e.to_string())
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Recover the intended JSON value from `text`.
pub fn recover_json(text: &str) -> Result<Value, MalformedResponseError> {
    recover_json_detailed(text, DEFAULT_PREVIEW_CHARS).map(|r| r.value)
}

/// Recover the intended JSON value, reporting which stage succeeded.
///
/// `preview_chars` bounds the input prefix copied into the error.
pub fn recover_json_detailed(
    text: &str,
    preview_chars: usize,
) -> Result<Recovered, MalformedResponseError> {
    let fail = |stage: RecoveryStage, reason: String| MalformedResponseError {
        stage,
        reason,
        input_len: text.len(),
        preview: preview(text, preview_chars),
    };

    if text.trim().is_empty() {
        return Err(fail(RecoveryStage::Direct, "empty response".to_string()));
    }

    if let Ok(value) = parse_object(text) {
        return Ok(Recovered {
            value,
            stage: RecoveryStage::Direct,
        });
    }

    let stripped = strip_reasoning(text);
    if stripped.len() != text.len() {
        tracing::debug!(
            removed = text.len() - stripped.len(),
            "recover_json: stripped reasoning blocks"
        );
        if let Ok(value) = parse_object(&stripped) {
            return Ok(Recovered {
                value,
                stage: RecoveryStage::ReasoningStripped,
            });
        }
    }

    for (index, block) in fenced_blocks(&stripped).into_iter().enumerate() {
        match parse_object(block) {
            Ok(value) => {
                return Ok(Recovered {
                    value,
                    stage: RecoveryStage::FencedBlock,
                })
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "recover_json: fenced block did not parse");
            }
        }
    }

    let candidate = last_balanced_object(&stripped).ok_or_else(|| {
        let reason = if stripped.contains('}') {
            "unbalanced braces before the last '}'"
        } else {
            "no closing brace found"
        };
        fail(RecoveryStage::LastObject, reason.to_string())
    })?;

    match parse_object(candidate) {
        Ok(value) => {
            tracing::warn!(
                input_len = text.len(),
                object_len = candidate.len(),
                "recover_json: fell back to last brace-balanced object"
            );
            Ok(Recovered {
                value,
                stage: RecoveryStage::LastObject,
            })
        }
        Err(e) => Err(fail(RecoveryStage::LastObject, e)),
    }
}
