//! 资料摄取：分块、嵌入并写入共享索引
//!
//! 文本提取（PDF 解析、音频转写、图像描述）在系统外完成，这里只接收
//! 提取好的文本。每个片段必须带上 chat_id 与 source_type 标签 —— 按聊天
//! 隔离完全依赖这两个标签被正确设置。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::llm::EmbeddingProvider;
use crate::retrieval::store::{Segment, SegmentMetadata, SegmentStore};

/// 资料来源类型（wire 字符串与前端/提取方约定一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    TextFile,
    Pdf,
    AudioTranscription,
    VideoFrames,
    Image,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::TextFile => "text_file",
            SourceType::Pdf => "pdf",
            SourceType::AudioTranscription => "audio_transcription",
            SourceType::VideoFrames => "video_frames",
            SourceType::Image => "image",
        }
    }
}

/// 摄取失败
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Extracted text is empty. Cannot ingest empty document.")]
    EmptyDocument,
    #[error("Embedding failed: {0}")]
    Embedding(String),
}

/// 分块参数
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// 目标块大小（字符数）
    pub chunk_size: usize,
    /// 块之间的重叠（字符数）
    pub chunk_overlap: usize,
    /// 分隔符优先级（从高到低）
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                "! ".to_string(),
                "? ".to_string(),
                " ".to_string(),
            ],
        }
    }
}

/// 文档分块器（UTF-8 安全，尽量在分隔符处断开）
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        if total_chars == 0 {
            return chunks;
        }

        let mut current_idx = 0;

        while current_idx < total_chars {
            let target_end = (current_idx + self.config.chunk_size).min(total_chars);
            let mut actual_end = target_end;

            // 不是文档末尾时，尝试在分隔符处断开
            if target_end < total_chars {
                let slice: String = chars[current_idx..target_end].iter().collect();
                for sep in &self.config.separators {
                    if let Some(pos) = slice.rfind(sep) {
                        let chars_to_sep: usize = slice[..pos].chars().count() + sep.chars().count();
                        if chars_to_sep > 0 {
                            actual_end = current_idx + chars_to_sep;
                            break;
                        }
                    }
                }
            }

            if actual_end <= current_idx {
                actual_end = (current_idx + 1).min(total_chars);
            }

            let chunk_text: String = chars[current_idx..actual_end].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            let overlap = self.config.chunk_overlap.min(actual_end - current_idx);
            let next_start = actual_end.saturating_sub(overlap);
            current_idx = if next_start > current_idx {
                next_start
            } else {
                actual_end
            };
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// 摄取器：分块 -> 嵌入 -> 带标签写入共享索引
pub struct Ingestor {
    chunker: Chunker,
    store: Arc<SegmentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Ingestor {
    pub fn new(
        store: Arc<SegmentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: ChunkingConfig,
    ) -> Self {
        Self {
            chunker: Chunker::new(config),
            store,
            embedder,
        }
    }

    /// 摄取一份提取好的文本，返回写入的片段数
    pub async fn ingest(
        &self,
        chat_id: &str,
        file_name: &str,
        source_type: SourceType,
        text: &str,
    ) -> Result<usize, IngestError> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let mut added = 0;
        for chunk in self.chunker.chunk(text) {
            let embedding = self
                .embedder
                .embed(&chunk)
                .await
                .map_err(IngestError::Embedding)?;
            let segment = Segment {
                text: chunk,
                metadata: SegmentMetadata {
                    chat_id: chat_id.to_string(),
                    source_type: source_type.as_str().to_string(),
                    file_name: file_name.to_string(),
                },
            };
            self.store
                .add(segment, embedding)
                .await
                .map_err(IngestError::Embedding)?;
            added += 1;
        }

        info!(
            "ingested '{}' ({}) for chat {}: {} segments",
            file_name,
            source_type.as_str(),
            chat_id,
            added
        );
        Ok(added)
    }
}
