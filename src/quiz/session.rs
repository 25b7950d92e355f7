//! 测验会话状态与按聊天注册表
//!
//! 每个 chat_id 一份可变测验状态，进程内存活，与持久化的聊天记录相互独立。
//! 注册表对每个条目持有独立的 Mutex：同一聊天的回合串行，不同聊天互不阻塞。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

/// 对话模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Explanation,
    Testing,
}

impl ChatMode {
    /// 非法/缺失的 mode 字符串回退为 explanation
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("testing") => ChatMode::Testing,
            _ => ChatMode::Explanation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Explanation => "explanation",
            ChatMode::Testing => "testing",
        }
    }
}

/// 题目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Mc,
    Open,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Mc => write!(f, "MC"),
            QuestionKind::Open => write!(f, "OPEN"),
        }
    }
}

/// 单个聊天的测验状态
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub current_mode: ChatMode,
    /// 上一回合发出了题目，正在等待用户作答
    pub waiting_for_answer: bool,
    /// 下一道新题是否为 OPEN；每次出题时翻转，保证 MC/OPEN 交替
    pub next_question_open: bool,
    pub last_question_type: Option<QuestionKind>,
    /// 仅当 last_question_type = MC 时存在
    pub last_correct_option_index: Option<usize>,
    pub last_question_text: Option<String>,
    /// 最近出过的题目文本，FIFO，至多 history_limit 条，无重复
    question_history: Vec<String>,
    history_limit: usize,
}

impl QuizSession {
    pub fn new(history_limit: usize) -> Self {
        Self {
            current_mode: ChatMode::Explanation,
            waiting_for_answer: false,
            next_question_open: false,
            last_question_type: None,
            last_correct_option_index: None,
            last_question_text: None,
            question_history: Vec::new(),
            history_limit,
        }
    }

    pub fn question_history(&self) -> &[String] {
        &self.question_history
    }

    /// 题目是否已在历史中（精确字符串匹配）
    pub fn has_asked(&self, question: &str) -> bool {
        self.question_history.iter().any(|q| q == question)
    }

    /// 记录新题目，满了先淘汰最旧的；重复文本不会二次入表
    pub fn record_question(&mut self, question: &str) {
        if self.has_asked(question) {
            return;
        }
        if self.question_history.len() >= self.history_limit {
            self.question_history.remove(0);
        }
        self.question_history.push(question.to_string());
    }
}

/// 按聊天的会话注册表：惰性创建，每个条目独立加锁
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<QuizSession>>>>,
    history_limit: usize,
}

impl SessionRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_limit,
        }
    }

    /// 返回已存在的会话，或创建带默认值的新会话；创建按 chat_id 幂等
    pub async fn get_or_create(&self, chat_id: &str) -> Arc<Mutex<QuizSession>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(chat_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(QuizSession::new(self.history_limit))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = QuizSession::new(10);
        assert_eq!(s.current_mode, ChatMode::Explanation);
        assert!(!s.waiting_for_answer);
        assert!(!s.next_question_open);
        assert!(s.last_question_type.is_none());
        assert!(s.last_correct_option_index.is_none());
        assert!(s.last_question_text.is_none());
        assert!(s.question_history().is_empty());
    }

    #[test]
    fn test_history_bounded_fifo() {
        let mut s = QuizSession::new(10);
        for i in 0..12 {
            s.record_question(&format!("q{}", i));
        }
        assert_eq!(s.question_history().len(), 10);
        assert_eq!(s.question_history()[0], "q2");
        assert_eq!(s.question_history()[9], "q11");
    }

    #[test]
    fn test_history_stays_distinct() {
        let mut s = QuizSession::new(10);
        s.record_question("q1");
        s.record_question("q1");
        assert_eq!(s.question_history().len(), 1);
        assert!(s.has_asked("q1"));
        assert!(!s.has_asked("q2"));
    }

    #[test]
    fn test_mode_parse_fallback() {
        assert_eq!(ChatMode::parse_or_default(Some("testing")), ChatMode::Testing);
        assert_eq!(
            ChatMode::parse_or_default(Some("explanation")),
            ChatMode::Explanation
        );
        assert_eq!(ChatMode::parse_or_default(Some("bogus")), ChatMode::Explanation);
        assert_eq!(ChatMode::parse_or_default(None), ChatMode::Explanation);
    }

    #[tokio::test]
    async fn test_get_or_create_idempotent() {
        let registry = SessionRegistry::new(10);
        let a = registry.get_or_create("chat-1").await;
        {
            let mut s = a.lock().await;
            s.next_question_open = true;
            s.record_question("q1");
        }
        let b = registry.get_or_create("chat-1").await;
        let s = b.lock().await;
        assert!(s.next_question_open);
        assert_eq!(s.question_history(), ["q1".to_string()]);
    }

    #[tokio::test]
    async fn test_sessions_independent_per_chat() {
        let registry = SessionRegistry::new(10);
        let a = registry.get_or_create("chat-a").await;
        a.lock().await.record_question("qa");

        let b = registry.get_or_create("chat-b").await;
        assert!(b.lock().await.question_history().is_empty());
    }
}
