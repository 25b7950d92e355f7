//! 提示词：系统消息与回合提示的构造
//!
//! 测试模式的系统消息约定了严格 JSON schema；出题/评卷提示与重试附注
//! 由引擎按回合拼装。

use crate::quiz::answer::option_label;
use crate::quiz::session::QuestionKind;

/// 测试模式系统消息：只输出 schema 约定的 JSON
pub const TESTING_SYSTEM_PROMPT: &str = r#"You are a strict AI Tutor API. Analyze uploaded documents AND image descriptions to conduct a test.

CONTEXT INSTRUCTION:
Use the provided context (text files AND image descriptions) to generate relevant questions and evaluate user answers.

RESPONSE FORMAT:
You MUST output ONLY valid JSON. No markdown outside JSON.

JSON SCHEMA:
{
  "evaluation": "CORRECT" | "INCORRECT" | null,
  "feedback": "Clear, concise explanation for the user's answer. MUST be relevant to the question topic. Or null if it is a new question.",
  "question": "Text of the NEW question or null if it is feedback.",
  "type": "MC" | "OPEN" | "FEEDBACK",
  "options": ["Option 1", "Option 2"] | null,
  "correctOptionIndex": 0 | null
}

LOGIC RULES:
1. If "GENERATE_QUESTION":
   - Generate a new question (either MC or OPEN) based directly on the uploaded materials.
   - ABSOLUTELY DO NOT REPEAT OR GENERATE QUESTIONS THAT ARE IDENTICAL IN MEANING OR WORDING TO ANY QUESTION IN THE PROVIDED HISTORY.
   - "evaluation": null. "feedback": null. "question": "New question text".
   - "type": "MC" or "OPEN".
   - "options": List of 3-4 options if "MC", else null.
   - "correctOptionIndex": 0-based index of the correct option, accurate for the given options if "MC", else null.
2. If "USER_ANSWER":
   - Evaluate the user's answer (an option letter A, B, C... or free text) against the PREVIOUS question's context.
   - "evaluation": "CORRECT" or "INCORRECT".
   - "feedback": MUST directly explain the correct answer to the PREVIOUS question and why the user's choice was correct or incorrect.
   - "question": null. "type": "FEEDBACK". "options": null. "correctOptionIndex": null.
"#;

/// 讲解模式系统消息：只依据上传资料作答
pub const EXPLANATION_SYSTEM_PROMPT: &str = r#"You are an AI Tutor. Answer based on the uploaded materials and their descriptions in this chat.

CRITICAL LANGUAGE RULE: ALL responses MUST be in English.

IMPORTANT CONTEXT RULE:
The retrieved context includes text files AND AI-generated descriptions of images/videos uploaded by the user.

1. Analysis and Inference: you may logically analyze and infer facts from the provided descriptions. For example, if a video description mentions a score change from '1-1' to '2-1', you MUST infer and state that 'a goal was scored.'
2. Direct Description: if the user asks what is in the video, use the text descriptions to describe the visual content.
3. Context Check (Strict): if after careful analysis of ALL available context (including inference) the topic is truly unsupported, respond with the exact phrase: "This topic is not covered in the uploaded materials." DO NOT use any external or general knowledge on the topic.
"#;

/// 标题生成系统消息：单次调用，无记忆
pub const TITLE_SYSTEM_PROMPT: &str =
    "Generate a short title (max 5 words) for this prompt. Return ONLY the title.";

/// 标题生成失败时的回退标题
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// MC 答案格式错误时的本地重提示（不消耗重试次数，不调用模型）
pub const INVALID_OPTION_REPROMPT: &str =
    "⚠️ Please select a valid option (e.g., A, B, C) or type a progress query.";

/// 出题提示：目标类型 + 拼接的历史题目
pub fn question_prompt(kind: QuestionKind, history: &[String]) -> String {
    format!(
        "GENERATE_QUESTION: Analyze documents and image descriptions. Generate a new question of TYPE: {}. AVOID generating questions identical to or highly similar to these in the history: {}",
        kind,
        history.join(" | ")
    )
}

/// MC 评卷提示：携带上一道题、用户选项、正误与正确选项
pub fn mc_evaluation_prompt(
    question: &str,
    user_index: usize,
    correct_index: usize,
) -> String {
    format!(
        "PREVIOUS_QUESTION: {}. USER_ANSWER: {}. Evaluate this. IS_CORRECT: {}. CORRECT_OPTION: {}. Generate a FEEDBACK response. The feedback MUST be concise, directly address the PREVIOUS_QUESTION, and explain the concept of the correct option.",
        question,
        option_label(user_index),
        user_index == correct_index,
        option_label(correct_index)
    )
}

/// OPEN 评卷提示：原始答案 + 按上一道题的语境评判
pub fn open_evaluation_prompt(answer: &str) -> String {
    format!(
        "USER_ANSWER: {}. Evaluate this answer based on the previous question context and generate a FEEDBACK response.",
        answer
    )
}

/// 出题回合失败后的附注：点名具体违规，要求换一道唯一的新题
pub fn question_retry_note(error: &str) -> String {
    format!(
        " (PREVIOUS ATTEMPT FAILED: {}. Generate a different, unique question in strict JSON format.)",
        error
    )
}

/// 评卷回合失败后的通用附注
pub const EVALUATION_RETRY_NOTE: &str =
    " (PREVIOUS ATTEMPT FAILED: Invalid JSON or Data. Ensure strict JSON format).";

/// 重试耗尽后的固定道歉，带最后一次失败的描述
pub fn apology(last_error: &str) -> String {
    format!(
        "⚠️ I encountered an error. Please try again. (Error: {})",
        last_error
    )
}
