//! HTTP 层共享状态

use std::sync::Arc;

use crate::assistant::TutorAssistant;
use crate::chat::ChatStore;
use crate::quiz::TutorEngine;
use crate::retrieval::Ingestor;

/// 所有 handler 共享的组件
pub struct AppState {
    pub engine: TutorEngine,
    pub assistant: Arc<TutorAssistant>,
    pub chats: ChatStore,
    pub ingestor: Ingestor,
}
