//! Streaming Plan Parser
//!
//! Watches a lesson plan as it streams in and reports the first step's
//! narration the moment its closing quote arrives, long before the document is
//! complete. Nothing here validates the document; the accumulated text is
//! handed to recovery once streaming ends.
//!
//! The scanner is incremental. It remembers its byte offset together with its
//! string, escape and depth state, so each fragment is examined once:
//!
//! 1. `SeekMarker`: look for `"whiteboard"` `:` `[` `{` (JSON whitespace allowed
//!    between tokens).
//! 2. `InStep`: walk the first step object, tracking keys at its top level only,
//!    until the narration key's string value closes.
//! 3. `Detected` / `Exhausted`: terminal. Exhausted means the first step closed
//!    without a narration string.

use serde::{Deserialize, Serialize};

/// Keys the scanner looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFieldNames {
    /// Top-level key holding the step array
    pub sequence_key: String,
    /// Step key holding the narration text
    pub narration_key: String,
}

impl Default for PlanFieldNames {
    fn default() -> Self {
        Self {
            sequence_key: "whiteboard".to_string(),
            narration_key: "explanation".to_string(),
        }
    }
}

/// Result of feeding one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub detected: bool,
    pub explanation: Option<String>,
}

impl Detection {
    fn found(explanation: String) -> Self {
        Self {
            detected: true,
            explanation: Some(explanation),
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

enum MarkerSearch {
    /// Byte offset of the first step's `{`
    Found(usize),
    /// Marker seen but the opening tokens have not all arrived
    Incomplete(usize),
    /// Resume searching from this offset
    Missing(usize),
}

enum Opening {
    Complete(usize),
    Incomplete,
    Mismatch,
}

fn is_json_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Match `: [ {` starting at `i`, returning the offset of the `{`.
fn match_step_opening(buf: &[u8], mut i: usize) -> Opening {
    for expected in [b':', b'[', b'{'] {
        while i < buf.len() && is_json_ws(buf[i]) {
            i += 1;
        }
        if i >= buf.len() {
            return Opening::Incomplete;
        }
        if buf[i] != expected {
            return Opening::Mismatch;
        }
        if expected == b'{' {
            return Opening::Complete(i);
        }
        i += 1;
    }
    Opening::Mismatch
}

fn find_first_step(buf: &[u8], from: usize, marker: &[u8]) -> MarkerSearch {
    let mut search = from;
    loop {
        let Some(rel) = find_bytes(&buf[search..], marker) else {
            // Keep a tail long enough to hold a marker split across fragments.
            let resume = buf.len().saturating_sub(marker.len() - 1).max(search);
            return MarkerSearch::Missing(resume);
        };
        let start = search + rel;
        match match_step_opening(buf, start + marker.len()) {
            Opening::Complete(brace) => return MarkerSearch::Found(brace),
            Opening::Incomplete => return MarkerSearch::Incomplete(start),
            Opening::Mismatch => search = start + 1,
        }
    }
}

enum StepProgress {
    Pending,
    Found(String),
    Closed,
}

/// Position and lexical state inside the first step object.
struct StepScan {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Offset of the opening quote of the current string
    string_start: usize,
    string_is_key: bool,
    value_is_target: bool,
    expect_key: bool,
    /// Last key read at depth 1, until its value ends
    pending_key: Option<String>,
}

impl StepScan {
    fn new(pos: usize) -> Self {
        Self {
            pos,
            depth: 1,
            in_string: false,
            escaped: false,
            string_start: pos,
            string_is_key: false,
            value_is_target: false,
            expect_key: true,
            pending_key: None,
        }
    }

    fn advance(&mut self, buf: &[u8], narration_key: &str) -> StepProgress {
        while self.pos < buf.len() {
            let i = self.pos;
            let b = buf[i];
            self.pos += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 1 {
                        let raw = &buf[self.string_start..=i];
                        if self.string_is_key {
                            self.pending_key = Some(decode_json_string(raw));
                        } else if self.value_is_target {
                            return StepProgress::Found(decode_json_string(raw));
                        }
                    }
                }
                continue;
            }

            match b {
                b'"' => {
                    self.in_string = true;
                    self.string_start = i;
                    if self.depth == 1 {
                        self.string_is_key = self.expect_key;
                        self.value_is_target = !self.expect_key
                            && self.pending_key.as_deref() == Some(narration_key);
                        self.expect_key = false;
                    }
                }
                b',' if self.depth == 1 => {
                    self.expect_key = true;
                    self.pending_key = None;
                }
                b'{' | b'[' => {
                    if self.depth == 1 {
                        self.pending_key = None;
                    }
                    self.depth += 1;
                }
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return StepProgress::Closed;
                    }
                }
                _ => {}
            }
        }
        StepProgress::Pending
    }
}

enum ScanState {
    SeekMarker { from: usize },
    InStep(StepScan),
    Detected,
    Exhausted,
}

/// Decode a complete quoted JSON string, tolerating raw control characters
/// and unknown escapes.
fn decode_json_string(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    if let Ok(decoded) = serde_json::from_str::<String>(&raw) {
        return decoded;
    }
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&raw);
    let literal = normalize_string_literal(inner);
    serde_json::from_str::<String>(&literal).unwrap_or_else(|e| {
        // Only lone surrogates get here.
        tracing::debug!(error = %e, "plan_stream: narration kept undecoded");
        inner.to_string()
    })
}

/// Rewrite string contents into a valid JSON literal: raw control characters
/// are escaped and an unknown escape keeps only the escaped character.
fn normalize_string_literal(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len() + 2);
    out.push('"');
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(e @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')) => {
                    out.push('\\');
                    out.push(e);
                }
                Some('u') => {
                    let hex: String = chars.clone().take(4).collect();
                    if hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()) {
                        out.push_str("\\u");
                    } else {
                        out.push('u');
                    }
                }
                Some(other) => push_literal_char(&mut out, other),
                None => out.push_str("\\\\"),
            },
            other => push_literal_char(&mut out, other),
        }
    }
    out.push('"');
    out
}

fn push_literal_char(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '"' => out.push_str("\\\""),
        c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
    }
}

// ---------------------------------------------------------------------------
// StreamingPlanParser
// ---------------------------------------------------------------------------

type NarrationCallback = Box<dyn FnOnce(String) + Send>;

/// Accumulates streamed plan text and fires once on the first step's narration.
pub struct StreamingPlanParser {
    fields: PlanFieldNames,
    marker: Vec<u8>,
    accumulated: String,
    state: ScanState,
    early_fired: bool,
    callback: Option<NarrationCallback>,
}

impl std::fmt::Debug for StreamingPlanParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingPlanParser")
            .field("fields", &self.fields)
            .field("accumulated_len", &self.accumulated.len())
            .field("early_fired", &self.early_fired)
            .finish()
    }
}

impl Default for StreamingPlanParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingPlanParser {
    pub fn new() -> Self {
        Self::with_fields(PlanFieldNames::default())
    }

    pub fn with_fields(fields: PlanFieldNames) -> Self {
        let marker = format!("\"{}\"", fields.sequence_key).into_bytes();
        Self {
            fields,
            marker,
            accumulated: String::new(),
            state: ScanState::SeekMarker { from: 0 },
            early_fired: false,
            callback: None,
        }
    }

    /// Invoke `callback` with the decoded narration on first detection.
    pub fn with_callback(mut self, callback: impl FnOnce(String) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Append `fragment` and report whether the first narration just completed.
    pub fn feed(&mut self, fragment: &str) -> Detection {
        if fragment.is_empty() {
            return Detection::default();
        }
        self.accumulated.push_str(fragment);
        if self.early_fired {
            return Detection::default();
        }

        let Some(explanation) = self.scan() else {
            return Detection::default();
        };

        self.early_fired = true;
        tracing::debug!(
            offset = self.accumulated.len(),
            chars = explanation.chars().count(),
            "plan stream: first narration detected"
        );
        if let Some(callback) = self.callback.take() {
            callback(explanation.clone());
        }
        Detection::found(explanation)
    }

    fn scan(&mut self) -> Option<String> {
        let buf = self.accumulated.as_bytes();
        let mut detected = None;
        while detected.is_none() {
            let next = match &mut self.state {
                ScanState::SeekMarker { from } => match find_first_step(buf, *from, &self.marker) {
                    MarkerSearch::Found(brace) => {
                        tracing::debug!(offset = brace, "plan stream: first step opened");
                        ScanState::InStep(StepScan::new(brace + 1))
                    }
                    MarkerSearch::Incomplete(at) | MarkerSearch::Missing(at) => {
                        *from = at;
                        return None;
                    }
                },
                ScanState::InStep(step) => match step.advance(buf, &self.fields.narration_key) {
                    StepProgress::Pending => return None,
                    StepProgress::Found(explanation) => {
                        detected = Some(explanation);
                        ScanState::Detected
                    }
                    StepProgress::Closed => {
                        tracing::debug!("plan stream: first step closed without narration");
                        ScanState::Exhausted
                    }
                },
                ScanState::Detected | ScanState::Exhausted => return None,
            };
            self.state = next;
        }
        detected
    }

    /// Whether the early narration has already been reported.
    pub fn has_fired(&self) -> bool {
        self.early_fired
    }

    /// Whether the first step closed without a narration string.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, ScanState::Exhausted)
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated
    }

    pub fn into_text(self) -> String {
        self.accumulated
    }

    /// Start a new session. A callback already consumed is not restored.
    pub fn reset(&mut self) {
        self.accumulated.clear();
        self.state = ScanState::SeekMarker { from: 0 };
        self.early_fired = false;
    }
}
