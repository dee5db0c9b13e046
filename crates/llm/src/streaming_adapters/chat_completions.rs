//! Chat-Completions SSE Adapter
//!
//! Handles the OpenAI-compatible `data: {...}` chunk format shared by most
//! lesson-generation backends. Reasoning models either send a separate
//! `reasoning_content` delta or inline their reasoning in `<think></think>`
//! tags; both are turned into thinking events so only the answer text reaches
//! the plan parser.

use chalkline_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
use serde::Deserialize;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

#[derive(Debug, Deserialize)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// State machine for parsing <think> tags
#[derive(Debug, Clone, Copy, PartialEq)]
enum ThinkState {
    /// Not in a thinking block, looking for <think>
    Normal,
    /// Inside a thinking block, looking for </think>
    InThinking,
}

/// Length of the longest suffix of `buffer` that is a proper prefix of `tag`.
///
/// That many trailing bytes must be held back because the next chunk may
/// complete the tag. Tags are ASCII, so the split point is a char boundary.
fn partial_tag_len(buffer: &str, tag: &str) -> usize {
    let max = (tag.len() - 1).min(buffer.len());
    (1..=max)
        .rev()
        .find(|&n| {
            let start = buffer.len() - n;
            buffer.is_char_boundary(start) && tag.starts_with(&buffer[start..])
        })
        .unwrap_or(0)
}

/// Adapter for OpenAI-compatible chat-completion streams
pub struct ChatCompletionsAdapter {
    provider: &'static str,
    state: ThinkState,
    /// Content not yet emitted because it may contain the start of a tag
    buffer: String,
    /// Whether a reasoning_content block is currently open
    reasoning_open: bool,
}

impl ChatCompletionsAdapter {
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            state: ThinkState::Normal,
            buffer: String::new(),
            reasoning_open: false,
        }
    }

    fn thinking_delta(content: String) -> UnifiedStreamEvent {
        UnifiedStreamEvent::ThinkingDelta {
            content,
            thinking_id: None,
        }
    }

    /// Process buffered content and extract thinking/text events.
    ///
    /// With `flush` set, a trailing partial tag is emitted as-is.
    fn process_buffer(&mut self, flush: bool) -> Vec<UnifiedStreamEvent> {
        let mut events = vec![];

        while !self.buffer.is_empty() {
            let tag = match self.state {
                ThinkState::Normal => THINK_OPEN,
                ThinkState::InThinking => THINK_CLOSE,
            };

            if let Some(pos) = self.buffer.find(tag) {
                let before = self.buffer[..pos].to_string();
                self.buffer = self.buffer[pos + tag.len()..].to_string();
                match self.state {
                    ThinkState::Normal => {
                        if !before.is_empty() {
                            events.push(UnifiedStreamEvent::TextDelta { content: before });
                        }
                        events.push(UnifiedStreamEvent::ThinkingStart { thinking_id: None });
                        self.state = ThinkState::InThinking;
                    }
                    ThinkState::InThinking => {
                        if !before.is_empty() {
                            events.push(Self::thinking_delta(before));
                        }
                        events.push(UnifiedStreamEvent::ThinkingEnd { thinking_id: None });
                        self.state = ThinkState::Normal;
                    }
                }
                continue;
            }

            let hold = if flush {
                0
            } else {
                partial_tag_len(&self.buffer, tag)
            };
            let emit_len = self.buffer.len() - hold;
            if emit_len > 0 {
                let emitted: String = self.buffer.drain(..emit_len).collect();
                match self.state {
                    ThinkState::Normal => {
                        events.push(UnifiedStreamEvent::TextDelta { content: emitted })
                    }
                    ThinkState::InThinking => events.push(Self::thinking_delta(emitted)),
                }
            }
            break;
        }

        events
    }

    /// Flush everything pending at the end of a stream.
    fn finish(&mut self) -> Vec<UnifiedStreamEvent> {
        let mut events = self.process_buffer(true);
        if self.reasoning_open {
            events.push(UnifiedStreamEvent::ThinkingEnd { thinking_id: None });
            self.reasoning_open = false;
        }
        if self.state == ThinkState::InThinking {
            events.push(UnifiedStreamEvent::ThinkingEnd { thinking_id: None });
            self.state = ThinkState::Normal;
        }
        events
    }
}

impl StreamAdapter for ChatCompletionsAdapter {
    fn provider_name(&self) -> &'static str {
        self.provider
    }

    fn supports_thinking(&self) -> bool {
        true
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // Handle SSE format
        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.is_empty() || trimmed.starts_with(':') {
            return Ok(vec![]);
        } else {
            trimmed
        };

        if json_str.is_empty() {
            return Ok(vec![]);
        }
        if json_str == "[DONE]" {
            return Ok(self.finish());
        }

        let event: ChunkEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        if let Some(usage) = event.usage {
            events.push(UnifiedStreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }

        for choice in event.choices {
            if let Some(delta) = choice.delta {
                if let Some(reasoning) = delta.reasoning_content.filter(|r| !r.is_empty()) {
                    if !self.reasoning_open {
                        events.push(UnifiedStreamEvent::ThinkingStart { thinking_id: None });
                        self.reasoning_open = true;
                    }
                    events.push(Self::thinking_delta(reasoning));
                }
                if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                    if self.reasoning_open {
                        events.push(UnifiedStreamEvent::ThinkingEnd { thinking_id: None });
                        self.reasoning_open = false;
                    }
                    self.buffer.push_str(&content);
                    events.extend(self.process_buffer(false));
                }
            }

            if let Some(finish_reason) = choice.finish_reason {
                events.extend(self.finish());
                events.push(UnifiedStreamEvent::Complete {
                    stop_reason: Some(finish_reason),
                });
            }
        }

        Ok(events)
    }

    fn reset(&mut self) {
        self.state = ThinkState::Normal;
        self.buffer.clear();
        self.reasoning_open = false;
    }
}
