//! 测验引擎：对话状态机 + 有界重试
//!
//! 一个回合要么出题（NEED_QUESTION）要么评卷（AWAITING_ANSWER），由会话的
//! waiting_for_answer 决定。每个回合内对「调模型 -> 严格校验」做至多
//! max_attempts 次串行尝试；出题回合每次从原始基础提示加具体违规附注重建，
//! 评卷回合在同一提示上累加通用附注。重试耗尽返回固定道歉文本 ——
//! 模型输出问题永远不会以错误形式逃出本层。

use std::sync::Arc;

use tracing::warn;

use crate::assistant::TutorAssistant;
use crate::quiz::answer::parse_option_letter;
use crate::quiz::format;
use crate::quiz::prompts::{
    apology, mc_evaluation_prompt, open_evaluation_prompt, question_prompt, question_retry_note,
    EVALUATION_RETRY_NOTE, EXPLANATION_SYSTEM_PROMPT, INVALID_OPTION_REPROMPT,
    TESTING_SYSTEM_PROMPT,
};
use crate::quiz::response::{validate, TestingResponse};
use crate::quiz::session::{ChatMode, QuestionKind, QuizSession, SessionRegistry};

/// 测验引擎：持有助手与会话注册表，按模式分发回合
pub struct TutorEngine {
    assistant: Arc<TutorAssistant>,
    registry: SessionRegistry,
    max_attempts: usize,
}

impl TutorEngine {
    pub fn new(assistant: Arc<TutorAssistant>, history_limit: usize, max_attempts: usize) -> Self {
        Self {
            assistant,
            registry: SessionRegistry::new(history_limit),
            max_attempts,
        }
    }

    /// 处理一条用户消息。整个回合持有该聊天的会话锁：同一聊天串行，
    /// 不同聊天并行。讲解模式的失败向上传播；测试模式永远返回文本。
    pub async fn respond(
        &self,
        chat_id: &str,
        message: &str,
        mode: ChatMode,
    ) -> Result<String, String> {
        let cell = self.registry.get_or_create(chat_id).await;
        let mut session = cell.lock().await;
        session.current_mode = mode;

        match mode {
            ChatMode::Explanation => {
                self.assistant
                    .chat(chat_id, EXPLANATION_SYSTEM_PROMPT, message)
                    .await
            }
            ChatMode::Testing => Ok(self.testing_turn(chat_id, message, &mut session).await),
        }
    }

    /// 一个测试模式回合：决定提示 -> 重试循环 -> 更新状态并渲染
    async fn testing_turn(
        &self,
        chat_id: &str,
        message: &str,
        session: &mut QuizSession,
    ) -> String {
        // base_prompt 仅在出题回合存在：失败后从它重建提示
        let (mut prompt, base_prompt) = if session.waiting_for_answer {
            let prompt = match (session.last_question_type, session.last_correct_option_index) {
                (Some(QuestionKind::Mc), Some(correct_index)) => {
                    let Some(user_index) = parse_option_letter(message) else {
                        // 本地恢复：不调模型，不消耗尝试次数，状态不变
                        return INVALID_OPTION_REPROMPT.to_string();
                    };
                    let question = session.last_question_text.clone().unwrap_or_default();
                    mc_evaluation_prompt(&question, user_index, correct_index)
                }
                _ => open_evaluation_prompt(message),
            };
            (prompt, None)
        } else {
            let kind = if session.next_question_open {
                QuestionKind::Open
            } else {
                QuestionKind::Mc
            };
            // 交替只由这次翻转决定，与模型实际返回的类型无关
            session.next_question_open = !session.next_question_open;
            session.last_question_type = Some(kind);
            session.last_correct_option_index = None;
            session.last_question_text = None;

            let base = question_prompt(kind, session.question_history());
            (base.clone(), Some(base))
        };

        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let outcome = match self
                .assistant
                .chat(chat_id, TESTING_SYSTEM_PROMPT, &prompt)
                .await
            {
                Ok(raw) => validate(&raw, session.question_history()).map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(response) => {
                    apply_response(session, &response);
                    return format::render(session, &response);
                }
                Err(error) => {
                    warn!("attempt {} failed: {}", attempt, error);
                    last_error = error;

                    match &base_prompt {
                        Some(base) => {
                            prompt = format!("{}{}", base, question_retry_note(&last_error));
                        }
                        None => prompt.push_str(EVALUATION_RETRY_NOTE),
                    }
                }
            }
        }

        apology(&last_error)
    }
}

/// 按回复类型更新会话：题目入历史并进入等待作答；反馈回到出题态
fn apply_response(session: &mut QuizSession, response: &TestingResponse) {
    match response {
        TestingResponse::Question {
            kind,
            text,
            correct_option_index,
            ..
        } => {
            session.record_question(text);
            session.last_question_text = Some(text.clone());
            session.last_question_type = Some(*kind);
            session.last_correct_option_index = *correct_option_index;
            session.waiting_for_answer = true;
        }
        TestingResponse::Feedback { .. } => {
            session.waiting_for_answer = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockEmbedder, MockLlmClient};
    use crate::retrieval::{ChatScopedRetriever, RetrieverConfig, SegmentStore};

    const MC_Q1: &str = r#"{"type": "MC", "question": "Which organelle produces ATP?", "options": ["Nucleus", "Mitochondrion", "Ribosome"], "correctOptionIndex": 1}"#;
    const OPEN_Q: &str = r#"{"type": "OPEN", "question": "Explain osmosis."}"#;
    const FEEDBACK_OK: &str =
        r#"{"type": "FEEDBACK", "evaluation": "CORRECT", "feedback": "Right, the mitochondrion."}"#;

    fn engine_with(replies: Vec<&str>) -> (TutorEngine, Arc<MockLlmClient>) {
        let llm = Arc::new(MockLlmClient::scripted(replies));
        let store = Arc::new(SegmentStore::new());
        let retriever = ChatScopedRetriever::new(
            store,
            Arc::new(MockEmbedder::new()),
            RetrieverConfig::default(),
        );
        let assistant = Arc::new(TutorAssistant::new(llm.clone(), retriever, 10));
        (TutorEngine::new(assistant, 10, 5), llm)
    }

    #[tokio::test]
    async fn test_first_question_targets_mc() {
        let (engine, llm) = engine_with(vec![MC_Q1]);

        let out = engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.contains("Question (MC)"));
        assert!(out.contains("**B)** Mitochondrion"));

        let prompts = llm.received_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("GENERATE_QUESTION"));
        assert!(prompts[0].contains("TYPE: MC"));
    }

    #[tokio::test]
    async fn test_mc_answer_letter_builds_correctness_prompt() {
        let (engine, llm) = engine_with(vec![MC_Q1, FEEDBACK_OK]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        let out = engine
            .respond("chat-1", "b)", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.starts_with("✅ **CORRECT**"));

        let prompts = llm.received_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("USER_ANSWER: B"));
        assert!(prompts[1].contains("IS_CORRECT: true"));
        assert!(prompts[1].contains("CORRECT_OPTION: B"));
        assert!(prompts[1].contains("Which organelle produces ATP?"));
    }

    #[tokio::test]
    async fn test_invalid_letter_reprompts_without_model_call() {
        let (engine, llm) = engine_with(vec![MC_Q1]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        let out = engine
            .respond("chat-1", "7", ChatMode::Testing)
            .await
            .unwrap();

        assert_eq!(out, INVALID_OPTION_REPROMPT);
        // 出题那一次之后再无模型调用
        assert_eq!(llm.received_prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_generated_questions_alternate_mc_open() {
        // 第二道题即使模型想继续出 MC，目标类型也必须是 OPEN
        let (engine, llm) = engine_with(vec![MC_Q1, FEEDBACK_OK, OPEN_Q]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        engine
            .respond("chat-1", "b", ChatMode::Testing)
            .await
            .unwrap();
        let out = engine
            .respond("chat-1", "next", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.contains("Question (OPEN)"));
        assert!(out.contains("Type your answer below"));

        let prompts = llm.received_prompts();
        assert!(prompts[0].contains("TYPE: MC"));
        assert!(prompts[2].contains("TYPE: OPEN"));
    }

    #[tokio::test]
    async fn test_alternation_is_independent_of_model_output() {
        // 目标 MC 但模型返回了合法 OPEN：被接受，且下一道题目标仍翻转为 OPEN
        let (engine, llm) = engine_with(vec![OPEN_Q, FEEDBACK_OK]);

        let out = engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        assert!(out.contains("Question (OPEN)"));

        engine
            .respond("chat-1", "water moves across membranes", ChatMode::Testing)
            .await
            .unwrap();

        let prompts = llm.received_prompts();
        assert!(prompts[0].contains("TYPE: MC"));
        assert!(prompts[1].contains("USER_ANSWER: water moves across membranes"));
    }

    #[tokio::test]
    async fn test_open_answer_uses_raw_text_prompt() {
        let (engine, llm) = engine_with(vec![OPEN_Q, FEEDBACK_OK]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        engine
            .respond("chat-1", "diffusion of water", ChatMode::Testing)
            .await
            .unwrap();

        let prompts = llm.received_prompts();
        assert!(prompts[1].starts_with("USER_ANSWER: diffusion of water"));
        assert!(prompts[1].contains("previous question context"));
    }

    #[tokio::test]
    async fn test_duplicate_question_retries_then_succeeds() {
        let unique = r#"{"type": "MC", "question": "What does DNA stand for?", "options": ["Acid", "Base", "Salt"], "correctOptionIndex": 0}"#;
        // 第一回合出 Q1；此后 4 次重复 Q1，第 5 次给出新题
        let (engine, llm) = engine_with(vec![
            MC_Q1,
            FEEDBACK_OK,
            MC_Q1,
            MC_Q1,
            MC_Q1,
            MC_Q1,
            unique,
        ]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        engine
            .respond("chat-1", "b", ChatMode::Testing)
            .await
            .unwrap();
        let out = engine
            .respond("chat-1", "next", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.contains("What does DNA stand for?"));

        let prompts = llm.received_prompts();
        // 2 回合 + 出题回合的 5 次尝试
        assert_eq!(prompts.len(), 7);
        // 重试提示从基础提示重建，并点名具体违规
        assert!(prompts[3].contains("PREVIOUS ATTEMPT FAILED"));
        assert!(prompts[3].contains("duplicate"));
        assert!(prompts[3].contains("GENERATE_QUESTION"));
        // 不叠加：第 5 次尝试只有一条附注
        assert_eq!(prompts[6].matches("PREVIOUS ATTEMPT FAILED").count(), 1);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_apology() {
        let (engine, _) = engine_with(vec![MC_Q1, FEEDBACK_OK, MC_Q1, MC_Q1, MC_Q1, MC_Q1, MC_Q1]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        engine
            .respond("chat-1", "b", ChatMode::Testing)
            .await
            .unwrap();
        let out = engine
            .respond("chat-1", "next", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.starts_with("⚠️ I encountered an error"));
        assert!(out.contains("duplicate"));
    }

    #[tokio::test]
    async fn test_evaluation_retry_accumulates_generic_note() {
        // 评卷回合前两次返回坏 JSON，第三次才给出反馈
        let (engine, llm) = engine_with(vec![MC_Q1, "garbage", "still garbage", FEEDBACK_OK]);

        engine
            .respond("chat-1", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        let out = engine
            .respond("chat-1", "a", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.starts_with("✅") || out.starts_with("❌"));

        let prompts = llm.received_prompts();
        assert_eq!(prompts.len(), 4);
        assert!(!prompts[1].contains("Invalid JSON or Data"));
        assert_eq!(prompts[2].matches("Invalid JSON or Data").count(), 1);
        assert_eq!(prompts[3].matches("Invalid JSON or Data").count(), 2);
    }

    #[tokio::test]
    async fn test_explanation_mode_is_plain_rag_chat() {
        let (engine, llm) = engine_with(vec!["Mitosis is cell division."]);

        let out = engine
            .respond("chat-1", "what is mitosis?", ChatMode::Explanation)
            .await
            .unwrap();

        assert_eq!(out, "Mitosis is cell division.");
        assert_eq!(llm.received_prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_quiz_state() {
        let (engine, llm) = engine_with(vec![MC_Q1, MC_Q1]);

        engine
            .respond("chat-a", "quiz me", ChatMode::Testing)
            .await
            .unwrap();
        // chat-b 没有在等答案，同一题文本也不算 b 的重复
        let out = engine
            .respond("chat-b", "quiz me", ChatMode::Testing)
            .await
            .unwrap();

        assert!(out.contains("Question (MC)"));
        assert_eq!(llm.received_prompts().len(), 2);
    }
}
