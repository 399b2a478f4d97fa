//! SSE accumulator for streamed chat completions.
//!
//! Chat-completion streams send `data:` lines whose JSON payload carries a
//! `choices[0].delta`.  Text arrives as plain string fragments; tool calls
//! arrive as an `index` plus fragments of the function name and arguments.
//! The stream ends with `data: [DONE]`.

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::llm::types::{LlmResponse, ToolCall, Usage};

/// Folds SSE lines into a single [`LlmResponse`].
#[derive(Debug, Default)]
pub struct ChatStreamAccumulator {
    text: String,
    /// Partial tool calls, positioned by their stream `index`.
    pending_calls: Vec<PendingCall>,
    done: bool,
    usage: Usage,
}

#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

impl ChatStreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Token usage reported so far (providers send it in the last chunk).
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Feed one SSE line.
    ///
    /// Returns the text fragment carried by the line, if any, so callers can
    /// render incremental output.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<String>> {
        let Some(data) = line.trim_end().strip_prefix("data:") else {
            // Blank lines, `:` comments and `event:` fields carry no payload.
            return Ok(None);
        };
        let data = data.trim();

        if data == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let chunk: Value = serde_json::from_str(data).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON in SSE data: {e}"),
        })?;

        if let Some(usage) = chunk.get("usage").filter(|u| !u.is_null()) {
            self.usage.input_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0) as u32;
            self.usage.output_tokens = usage["completion_tokens"].as_u64().unwrap_or(0) as u32;
        }

        let delta = &chunk["choices"][0]["delta"];
        if delta.is_null() {
            return Ok(None);
        }

        if let Some(fragments) = delta["tool_calls"].as_array() {
            for fragment in fragments {
                self.apply_tool_fragment(fragment);
            }
        }

        match delta["content"].as_str() {
            Some(text) if !text.is_empty() => {
                self.text.push_str(text);
                Ok(Some(text.to_owned()))
            }
            _ => Ok(None),
        }
    }

    fn apply_tool_fragment(&mut self, fragment: &Value) {
        let index = fragment["index"].as_u64().unwrap_or(0) as usize;
        if self.pending_calls.len() <= index {
            self.pending_calls.resize_with(index + 1, PendingCall::default);
        }
        let call = &mut self.pending_calls[index];

        if let Some(id) = fragment["id"].as_str() {
            call.id = id.to_owned();
        }
        if let Some(name) = fragment["function"]["name"].as_str() {
            call.name.push_str(name);
        }
        if let Some(args) = fragment["function"]["arguments"].as_str() {
            call.arguments.push_str(args);
        }
    }

    /// Finish the stream.  Tool calls win over text, as in non-streaming mode.
    pub fn into_response(self) -> Result<LlmResponse> {
        if self.pending_calls.is_empty() {
            return Ok(LlmResponse::Text(self.text));
        }

        let calls = self
            .pending_calls
            .into_iter()
            .map(|call| {
                let arguments = if call.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        AgentError::LlmParseFailed {
                            reason: format!("invalid JSON in tool call `{}` arguments: {e}", call.name),
                        }
                    })?
                };
                Ok(ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LlmResponse::ToolCalls(calls))
    }
}
