//! tutor 服务入口
//!
//! 启动: cargo run
//! 无 OPENAI_API_KEY 时自动降级为 Mock LLM 与确定性嵌入，便于本地联调。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use tutor::api::{router, AppState};
use tutor::assistant::TutorAssistant;
use tutor::chat::ChatStore;
use tutor::config::{load_config, AppConfig};
use tutor::llm::{
    EmbeddingProvider, LlmClient, MockEmbedder, MockLlmClient, OpenAiClient, OpenAiEmbedder,
};
use tutor::observability;
use tutor::quiz::TutorEngine;
use tutor::retrieval::{
    ChatScopedRetriever, ChunkingConfig, Ingestor, RetrieverConfig, SegmentStore,
};

/// 按配置与环境选择 LLM 后端；无 Key 或 provider 未知时用 Mock
fn create_llm(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_key = std::env::var("OPENAI_API_KEY").is_ok();

    if provider == "openai" && has_key {
        info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
            Duration::from_secs(cfg.llm.timeouts.request),
        ))
    } else {
        warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}

/// 嵌入后端与 LLM 共用 Key；无 Key 时用确定性 Mock 嵌入
fn create_embedder(cfg: &AppConfig) -> Arc<dyn EmbeddingProvider> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        info!("Using OpenAI-compatible embeddings ({})", cfg.llm.embedding_model);
        Arc::new(OpenAiEmbedder::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.embedding_model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        warn!("No API key set, using deterministic mock embeddings");
        Arc::new(MockEmbedder::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        warn!("config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let llm = create_llm(&cfg);
    let embedder = create_embedder(&cfg);

    let store = Arc::new(SegmentStore::new());
    let retriever = ChatScopedRetriever::new(
        store.clone(),
        embedder.clone(),
        RetrieverConfig {
            max_results: cfg.retrieval.max_results,
            min_score: cfg.retrieval.min_score,
            overfetch_factor: cfg.retrieval.overfetch_factor,
        },
    );
    let ingestor = Ingestor::new(
        store,
        embedder,
        ChunkingConfig {
            chunk_size: cfg.ingestion.chunk_size,
            chunk_overlap: cfg.ingestion.chunk_overlap,
            ..Default::default()
        },
    );

    let assistant = Arc::new(TutorAssistant::new(
        llm,
        retriever,
        cfg.app.max_context_messages,
    ));
    let engine = TutorEngine::new(
        assistant.clone(),
        cfg.quiz.history_limit,
        cfg.quiz.max_attempts,
    );

    let state = Arc::new(AppState {
        engine,
        assistant,
        chats: ChatStore::new(),
        ingestor,
    });

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("tutor listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
