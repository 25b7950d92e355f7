//! 聊天记录层

pub mod records;

pub use records::{Chat, ChatMessage, ChatStore, ChatSummary};
