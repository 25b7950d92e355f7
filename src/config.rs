//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TUTOR__*` 覆盖（双下划线表示嵌套，如 `TUTOR__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub quiz: QuizSection,
    #[serde(default)]
    pub ingestion: IngestionSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// [app] 段：应用名、每个聊天保留的对话消息数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 每个聊天的消息窗口（条数，user/assistant 合计）
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
}

fn default_max_context_messages() -> usize {
    10
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            max_context_messages: default_max_context_messages(),
        }
    }
}

/// [llm] 段：后端选择、模型名与超时
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    /// 后端：openai 兼容端点 / mock；无 API Key 时自动降级为 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 嵌入模型（与对话模型共用端点与 Key）
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmTimeoutsSection {
    /// 单次模型调用的硬超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    120
}

/// [retrieval] 段：检索条数、分数阈值与过量抓取倍数
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSection {
    /// 过滤后返回给聊天的最大片段数
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// 相似度下限，低于该分数的候选不参与过滤
    #[serde(default)]
    pub min_score: f32,
    /// 共享索引无按聊天分区，过滤前按 max_results * overfetch_factor 抓取候选
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
}

fn default_max_results() -> usize {
    10
}

fn default_overfetch_factor() -> usize {
    100
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_score: 0.0,
            overfetch_factor: default_overfetch_factor(),
        }
    }
}

/// [quiz] 段：测验循环的重试上限与题目历史长度
#[derive(Debug, Clone, Deserialize)]
pub struct QuizSection {
    /// 单个回合内 prompt->校验 的最大尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// 题目历史保留条数（去重用，FIFO 淘汰）
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_attempts() -> usize {
    5
}

fn default_history_limit() -> usize {
    10
}

impl Default for QuizSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            history_limit: default_history_limit(),
        }
    }
}

/// [ingestion] 段：文档分块参数
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSection {
    /// 目标块大小（字符数）
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 块之间的重叠（字符数）
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// [server] 段：HTTP 监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            retrieval: RetrievalSection::default(),
            quiz: QuizSection::default(),
            ingestion: IngestionSection::default(),
            server: ServerSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 TUTOR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TUTOR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TUTOR")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
