//! 检索层：共享片段索引、按聊天隔离的检索器与资料摄取

pub mod ingest;
pub mod retriever;
pub mod store;

pub use ingest::{ChunkingConfig, Chunker, IngestError, Ingestor, SourceType};
pub use retriever::{ChatScopedRetriever, RetrieverConfig};
pub use store::{ScoredSegment, Segment, SegmentMetadata, SegmentStore};
