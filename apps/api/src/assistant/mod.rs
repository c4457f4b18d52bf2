//! Recruiting assistant: a tool-calling conversation over the Messages API.
//!
//! Each `/api/chat` request starts a fresh conversation: the user prompt goes
//! out with the tool catalogue, tool calls are run in-process and answered,
//! and the loop ends when the model replies without calling a tool or after
//! `MAX_TOOL_ROUNDS` rounds of tool calls.

pub mod handlers;
pub mod prompts;
pub mod tools;

use serde::Serialize;
use tracing::{info, warn};

use crate::assistant::prompts::{ASSISTANT_SYSTEM, TOOL_BUDGET_EXHAUSTED};
use crate::assistant::tools::{definitions, Toolbox};
use crate::llm_client::{ChatModel, ContentBlock, LlmError, Message, Role};

pub const MAX_TOOL_ROUNDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// Tool names in call order, repeats included.
    pub tools_used: Vec<String>,
}

pub async fn run_chat(model: &dyn ChatModel, toolbox: &Toolbox, prompt: &str) -> Result<ChatReply, LlmError> {
    let tools = definitions();
    let mut messages = vec![Message::user_text(prompt)];
    let mut tools_used = Vec::new();

    for round in 0..=MAX_TOOL_ROUNDS {
        let reply = model.converse(ASSISTANT_SYSTEM, &messages, &tools).await?;
        let calls = reply.tool_uses();

        if calls.is_empty() {
            return Ok(ChatReply {
                response: reply.text(),
                tools_used,
            });
        }
        if round == MAX_TOOL_ROUNDS {
            warn!("Assistant still calling tools after {MAX_TOOL_ROUNDS} rounds; giving up");
            break;
        }

        let mut results = Vec::with_capacity(calls.len());
        for (id, name, input) in calls {
            info!("Assistant tool call: {name}");
            tools_used.push(name.to_string());
            let block = match toolbox.dispatch(name, input).await {
                Ok(value) => ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content: value.to_string(),
                    is_error: false,
                },
                Err(e) => {
                    warn!("Tool {name} failed: {e}");
                    ContentBlock::ToolResult {
                        tool_use_id: id.to_string(),
                        content: e.to_string(),
                        is_error: true,
                    }
                }
            };
            results.push(block);
        }

        let assistant_turn: Vec<ContentBlock> = reply
            .content
            .into_iter()
            .filter(|b| !matches!(b, ContentBlock::Other))
            .collect();
        messages.push(Message {
            role: Role::Assistant,
            content: assistant_turn,
        });
        messages.push(Message {
            role: Role::User,
            content: results,
        });
    }

    Ok(ChatReply {
        response: TOOL_BUDGET_EXHAUSTED.to_string(),
        tools_used,
    })
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::llm_client::{ChatModel, ContentBlock, LlmError, LlmResponse, Message, ToolDefinition, Usage};

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<LlmResponse>>,
        pub seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<LlmResponse>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            }
        }
    }

    pub fn text_reply(text: &str) -> LlmResponse {
        LlmResponse {
            content: vec![ContentBlock::Text { text: text.to_string() }],
            stop_reason: Some("end_turn".to_string()),
            usage: Usage::default(),
        }
    }

    pub fn tool_reply(id: &str, name: &str, input: Value) -> LlmResponse {
        LlmResponse {
            content: vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }],
            stop_reason: Some("tool_use".to_string()),
            usage: Usage::default(),
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn converse(
            &self,
            _system: &str,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies.lock().unwrap().pop_front().ok_or(LlmError::EmptyContent)
        }
    }
}
