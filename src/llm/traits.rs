//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient::complete；调用是同步往返（无流式），
//! 超时在实现内部强制执行。

use async_trait::async_trait;

use crate::memory::Message;

/// LLM 客户端 trait：一次完成调用，返回原始文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；失败时返回错误描述字符串
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
