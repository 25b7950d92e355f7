//! 共享片段索引：内存向量存储与相似度检索
//!
//! 所有聊天的资料片段都进同一个索引（无按聊天分区）；按聊天隔离由上层
//! ChatScopedRetriever 的元数据过滤保证。核心只追加、只查询，不做更新。

use tokio::sync::RwLock;

/// 片段元数据：chat_id 是隔离的全部依据，必须由摄取方正确设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMetadata {
    pub chat_id: String,
    pub source_type: String,
    pub file_name: String,
}

/// 资料片段：文本 + 元数据
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub metadata: SegmentMetadata,
}

/// 带分数的检索命中
#[derive(Debug, Clone)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub score: f32,
}

/// 内存片段存储：(片段, 向量) 列表
#[derive(Default)]
pub struct SegmentStore {
    entries: RwLock<Vec<(Segment, Vec<f32>)>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加片段；空向量拒绝
    pub async fn add(&self, segment: Segment, embedding: Vec<f32>) -> Result<(), String> {
        if embedding.is_empty() {
            return Err("Empty embedding".to_string());
        }
        self.entries.write().await.push((segment, embedding));
        Ok(())
    }

    /// 相似度检索：分数 >= min_score 的候选，按分数降序，截断到 limit
    pub async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Vec<ScoredSegment> {
        let entries = self.entries.read().await;

        let mut scored: Vec<ScoredSegment> = entries
            .iter()
            .map(|(segment, emb)| ScoredSegment {
                segment: segment.clone(),
                score: cosine_similarity(query_embedding, emb),
            })
            .filter(|s| s.score >= min_score)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// 余弦相似度
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
pub(crate) fn segment(chat_id: &str, text: &str) -> Segment {
    Segment {
        text: text.to_string(),
        metadata: SegmentMetadata {
            chat_id: chat_id.to_string(),
            source_type: "text_file".to_string(),
            file_name: "notes.txt".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_and_truncates() {
        let store = SegmentStore::new();
        store
            .add(segment("c1", "far"), vec![0.0, 1.0])
            .await
            .unwrap();
        store
            .add(segment("c1", "near"), vec![1.0, 0.0])
            .await
            .unwrap();
        store
            .add(segment("c1", "mid"), vec![0.7, 0.7])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2, 0.0).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].segment.text, "near");
        assert_eq!(hits[1].segment.text, "mid");
    }

    #[tokio::test]
    async fn test_search_min_score_cuts_candidates() {
        let store = SegmentStore::new();
        store
            .add(segment("c1", "orthogonal"), vec![0.0, 1.0])
            .await
            .unwrap();
        store
            .add(segment("c1", "aligned"), vec![1.0, 0.0])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 10, 0.5).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].segment.text, "aligned");
    }

    #[tokio::test]
    async fn test_rejects_empty_embedding() {
        let store = SegmentStore::new();
        assert!(store.add(segment("c1", "x"), vec![]).await.is_err());
        assert!(store.is_empty().await);
    }
}
