//! 按聊天隔离的检索器
//!
//! 共享索引没有按聊天分区，隔离完全靠取回后的元数据过滤：
//! 先按 max_results * overfetch_factor 过量抓取候选（防止其他聊天的高分片段
//! 挤掉本聊天的结果），再保留 chat_id 完全相等的片段，最后截断到 max_results，
//! 相似度顺序保持不变。

use std::sync::Arc;

use tracing::{debug, info};

use crate::llm::EmbeddingProvider;
use crate::retrieval::store::{Segment, SegmentStore};

/// 检索参数：条数、分数阈值与过量抓取倍数（可调，见 [retrieval] 配置段）
#[derive(Debug, Clone, Copy)]
pub struct RetrieverConfig {
    pub max_results: usize,
    pub min_score: f32,
    pub overfetch_factor: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_score: 0.0,
            overfetch_factor: 100,
        }
    }
}

/// 聊天范围检索器：embed 查询 -> 过量抓取 -> chat_id 过滤 -> 截断
pub struct ChatScopedRetriever {
    store: Arc<SegmentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrieverConfig,
}

impl ChatScopedRetriever {
    pub fn new(
        store: Arc<SegmentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// 返回只属于 chat_id 的片段，按相似度降序，至多 max_results 条
    pub async fn retrieve(&self, chat_id: &str, query: &str) -> Result<Vec<Segment>, String> {
        info!("retrieving for chat '{}', query: '{}'", chat_id, query);

        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .store
            .search(
                &query_embedding,
                self.config.max_results * self.config.overfetch_factor,
                self.config.min_score,
            )
            .await;

        debug!("{} candidates before chat filter", candidates.len());

        let filtered: Vec<Segment> = candidates
            .into_iter()
            .filter(|hit| hit.segment.metadata.chat_id == chat_id)
            .take(self.config.max_results)
            .map(|hit| hit.segment)
            .collect();

        info!("{} segments relevant to this chat", filtered.len());

        Ok(filtered)
    }
}
