//! 记忆层：每聊天的对话消息窗口

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
