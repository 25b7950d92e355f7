//! 导师助手：一次模型往返 = 检索 + 消息窗口 + 系统提示
//!
//! 每个聊天持有自己的消息窗口；检索结果只来自该聊天自己的资料
//! （ChatScopedRetriever 负责隔离）。标题生成是单次调用，无记忆。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::llm::LlmClient;
use crate::memory::{ConversationMemory, Message};
use crate::quiz::prompts::{DEFAULT_CHAT_TITLE, TITLE_SYSTEM_PROMPT};
use crate::retrieval::{ChatScopedRetriever, Segment};

/// 检索增强的对话助手
pub struct TutorAssistant {
    llm: Arc<dyn LlmClient>,
    retriever: ChatScopedRetriever,
    /// chat_id -> 消息窗口
    memories: RwLock<HashMap<String, ConversationMemory>>,
    max_context_messages: usize,
}

impl TutorAssistant {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: ChatScopedRetriever,
        max_context_messages: usize,
    ) -> Self {
        Self {
            llm,
            retriever,
            memories: RwLock::new(HashMap::new()),
            max_context_messages,
        }
    }

    /// 一次对话往返：检索该聊天的资料 -> 拼上下文 -> 调模型 -> 写回窗口
    pub async fn chat(
        &self,
        chat_id: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, String> {
        let segments = self.retriever.retrieve(chat_id, user_message).await?;
        let augmented = augment_with_context(user_message, &segments);

        let mut messages = vec![Message::system(system_prompt)];
        {
            let memories = self.memories.read().await;
            if let Some(memory) = memories.get(chat_id) {
                messages.extend(memory.messages().iter().cloned());
            }
        }
        messages.push(Message::user(augmented));

        let reply = self.llm.complete(&messages).await?;

        let mut memories = self.memories.write().await;
        let memory = memories
            .entry(chat_id.to_string())
            .or_insert_with(|| ConversationMemory::new(self.max_context_messages));
        memory.push(Message::user(user_message));
        memory.push(Message::assistant(reply.clone()));

        Ok(reply)
    }

    /// 生成聊天标题：失败或空结果时回退为固定默认
    pub async fn generate_title(&self, prompt: &str) -> String {
        let messages = vec![
            Message::system(TITLE_SYSTEM_PROMPT),
            Message::user(prompt),
        ];
        match self.llm.complete(&messages).await {
            Ok(raw) => {
                let title = raw.replace('"', "").trim().to_string();
                if title.is_empty() {
                    DEFAULT_CHAT_TITLE.to_string()
                } else {
                    title
                }
            }
            Err(e) => {
                warn!("title generation failed: {}", e);
                DEFAULT_CHAT_TITLE.to_string()
            }
        }
    }
}

/// 将检索到的片段拼进提示；无片段时原样返回
fn augment_with_context(user_message: &str, segments: &[Segment]) -> String {
    if segments.is_empty() {
        return user_message.to_string();
    }

    let mut out = String::from("Relevant material from this chat:\n\n");
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&format!(
            "[Context {} | {}]\n{}\n\n",
            i + 1,
            segment.metadata.source_type,
            segment.text
        ));
    }
    out.push_str(user_message);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::{MockEmbedder, MockLlmClient};
    use crate::retrieval::{RetrieverConfig, SegmentStore};

    fn assistant_with(llm: Arc<MockLlmClient>) -> TutorAssistant {
        let store = Arc::new(SegmentStore::new());
        let retriever =
            ChatScopedRetriever::new(store, Arc::new(MockEmbedder::new()), RetrieverConfig::default());
        TutorAssistant::new(llm, retriever, 4)
    }

    #[tokio::test]
    async fn test_title_strips_quotes() {
        let llm = Arc::new(MockLlmClient::scripted(vec!["\"Cell Biology Basics\"\n"]));
        let assistant = assistant_with(llm);
        assert_eq!(
            assistant.generate_title("tell me about cells").await,
            "Cell Biology Basics"
        );
    }

    #[tokio::test]
    async fn test_title_falls_back_on_empty() {
        let llm = Arc::new(MockLlmClient::scripted(vec!["  \"\"  "]));
        let assistant = assistant_with(llm);
        assert_eq!(
            assistant.generate_title("whatever").await,
            DEFAULT_CHAT_TITLE
        );
    }

    #[tokio::test]
    async fn test_memory_window_bounds_history() {
        let llm = Arc::new(MockLlmClient::new());
        let assistant = assistant_with(llm);

        for i in 0..5 {
            assistant
                .chat("chat-1", "system", &format!("message {}", i))
                .await
                .unwrap();
        }

        let memories = assistant.memories.read().await;
        let memory = memories.get("chat-1").unwrap();
        assert_eq!(memory.len(), 4);
    }

    #[tokio::test]
    async fn test_memories_are_per_chat() {
        let llm = Arc::new(MockLlmClient::new());
        let assistant = assistant_with(llm);

        assistant.chat("chat-a", "system", "hello").await.unwrap();

        let memories = assistant.memories.read().await;
        assert!(memories.get("chat-a").is_some());
        assert!(memories.get("chat-b").is_none());
    }

    #[test]
    fn test_augment_without_segments_is_identity() {
        assert_eq!(augment_with_context("hi", &[]), "hi");
    }
}
