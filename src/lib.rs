//! Tutor - 基于上传资料的学习导师后端
//!
//! 模块划分：
//! - **api**: HTTP 边界（axum 路由 + 共享状态）
//! - **assistant**: 检索增强的对话助手与标题生成
//! - **chat**: 聊天记录（Chat / ChatMessage / 内存存储）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）与嵌入 API
//! - **memory**: 每聊天的对话消息窗口
//! - **observability**: tracing 初始化
//! - **quiz**: 测验核心（会话状态、校验、状态机、渲染）
//! - **retrieval**: 共享片段索引、按聊天隔离的检索与资料摄取

pub mod api;
pub mod assistant;
pub mod chat;
pub mod config;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod quiz;
pub mod retrieval;
