//! Mock LLM 客户端（用于测试与无 Key 运行）
//!
//! 两种用法：scripted 按队列依次返回预置回复并记录每次收到的最后一条 User 消息
//! （测试用）；空队列时回显最后一条 User 消息，便于本地跑通流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：队列回复 + 提示词记录
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// 回显模式（无预置回复）
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置回复队列，按调用顺序弹出
    pub fn scripted(replies: Vec<impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的提示词（每次调用的最后一条 User 消息内容）
    pub fn received_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "(no input)".to_string());

        self.prompts.lock().unwrap().push(last_user.clone());

        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(reply);
        }

        Ok(format!("Echo from Mock: {}", last_user))
    }
}
