//! 聊天记录：Chat / ChatMessage 与内存存储
//!
//! 这是展示用的消息流水，与测验会话的可变状态相互独立。进程内存活，
//! 持久化属于外部协作方。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::quiz::prompts::DEFAULT_CHAT_TITLE;

/// 单条聊天消息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    /// true = 模型消息，false = 用户消息
    pub model_message: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>, model_message: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            model_message,
            created_at: Utc::now(),
        }
    }
}

/// 一个聊天：id、标题与消息列表
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

impl Chat {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
        }
    }
}

/// 聊天摘要（列表视图用）
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
}

/// 内存聊天存储
#[derive(Default)]
pub struct ChatStore {
    chats: RwLock<HashMap<String, Chat>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 缺失 /"new"/ 未知 id 一律得到新聊天
    pub async fn get_or_create(&self, chat_id: Option<&str>) -> Chat {
        if let Some(id) = chat_id {
            if id != "new" {
                if let Some(chat) = self.chats.read().await.get(id) {
                    return chat.clone();
                }
            }
        }

        let chat = Chat::new();
        self.chats
            .write()
            .await
            .insert(chat.id.clone(), chat.clone());
        chat
    }

    pub async fn create(&self) -> Chat {
        self.get_or_create(None).await
    }

    pub async fn delete(&self, chat_id: &str) {
        self.chats.write().await.remove(chat_id);
    }

    pub async fn list(&self) -> Vec<ChatSummary> {
        self.chats
            .read()
            .await
            .values()
            .map(|c| ChatSummary {
                id: c.id.clone(),
                title: c.title.clone(),
            })
            .collect()
    }

    /// 追加消息；聊天不存在则忽略
    pub async fn append_message(&self, chat_id: &str, message: &str, model_message: bool) {
        let mut chats = self.chats.write().await;
        if let Some(chat) = chats.get_mut(chat_id) {
            chat.messages.push(ChatMessage::new(message, model_message));
        }
    }

    /// 更新标题，返回更新后的摘要；聊天不存在返回 None
    pub async fn set_title(&self, chat_id: &str, title: &str) -> Option<ChatSummary> {
        let mut chats = self.chats.write().await;
        let chat = chats.get_mut(chat_id)?;
        chat.title = title.trim().to_string();
        Some(ChatSummary {
            id: chat.id.clone(),
            title: chat.title.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_reuses_known_id() {
        let store = ChatStore::new();
        let chat = store.create().await;
        let again = store.get_or_create(Some(&chat.id)).await;
        assert_eq!(chat.id, again.id);
    }

    #[tokio::test]
    async fn test_new_and_unknown_ids_create_fresh_chats() {
        let store = ChatStore::new();
        let a = store.get_or_create(Some("new")).await;
        let b = store.get_or_create(Some("does-not-exist")).await;
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, DEFAULT_CHAT_TITLE);
        assert_eq!(store.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_messages_append_in_order() {
        let store = ChatStore::new();
        let chat = store.create().await;
        store.append_message(&chat.id, "hello", false).await;
        store.append_message(&chat.id, "hi there", true).await;

        let chat = store.get_or_create(Some(&chat.id)).await;
        assert_eq!(chat.messages.len(), 2);
        assert!(!chat.messages[0].model_message);
        assert!(chat.messages[1].model_message);
    }

    #[tokio::test]
    async fn test_delete_and_set_title() {
        let store = ChatStore::new();
        let chat = store.create().await;

        let summary = store.set_title(&chat.id, "  Cell Biology  ").await.unwrap();
        assert_eq!(summary.title, "Cell Biology");

        store.delete(&chat.id).await;
        assert!(store.list().await.is_empty());
        assert!(store.set_title(&chat.id, "x").await.is_none());
    }
}
