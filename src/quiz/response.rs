//! 模型结构化输出的解析与严格校验
//!
//! 模型在测试模式下必须输出固定 schema 的 JSON（可能包在 Markdown 代码围栏里）。
//! 校验失败不是异常，而是 ValidationError 值，交给重试循环消费。

use serde::Deserialize;
use thiserror::Error;

use crate::quiz::session::QuestionKind;

/// 校验失败的具体违规，全部可重试
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Question text is missing.")]
    MissingQuestion,
    #[error("Question text is a duplicate. A different, unique question is required.")]
    DuplicateQuestion,
    #[error("MC question must have a valid correctOptionIndex.")]
    InvalidCorrectIndex,
}

/// 答案评判结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Correct,
    Incorrect,
}

impl Evaluation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Evaluation::Correct => "CORRECT",
            Evaluation::Incorrect => "INCORRECT",
        }
    }
}

/// 校验通过后的结构化回复
#[derive(Debug, Clone)]
pub enum TestingResponse {
    /// 新题目（MC 含选项与正确下标；OPEN 两者为空）
    Question {
        kind: QuestionKind,
        text: String,
        options: Vec<String>,
        correct_option_index: Option<usize>,
    },
    /// 对用户答案的反馈
    Feedback {
        evaluation: Evaluation,
        text: String,
    },
}

/// wire schema 原样映射（字段名与模型约定一致）
#[derive(Debug, Deserialize)]
struct RawResponse {
    evaluation: Option<String>,
    feedback: Option<String>,
    question: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    options: Option<Vec<String>>,
    #[serde(rename = "correctOptionIndex")]
    correct_option_index: Option<i64>,
}

/// 去掉 Markdown 代码围栏标记
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// 解析并严格校验模型输出；history 用于题目去重（精确字符串匹配）
pub fn validate(raw: &str, history: &[String]) -> Result<TestingResponse, ValidationError> {
    let clean = strip_code_fences(raw);

    let parsed: RawResponse =
        serde_json::from_str(&clean).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let kind = parsed
        .kind
        .as_deref()
        .map(str::to_uppercase)
        .ok_or_else(|| ValidationError::Malformed("missing type".to_string()))?;

    match kind.as_str() {
        "MC" | "OPEN" => {
            let question = match parsed.question {
                Some(q) if !q.is_empty() => q,
                _ => return Err(ValidationError::MissingQuestion),
            };
            if history.iter().any(|h| h == &question) {
                return Err(ValidationError::DuplicateQuestion);
            }

            if kind == "MC" {
                let options = parsed.options.unwrap_or_default();
                let index = match parsed.correct_option_index {
                    Some(i) if i >= 0 && (i as usize) < options.len() => i as usize,
                    _ => return Err(ValidationError::InvalidCorrectIndex),
                };
                Ok(TestingResponse::Question {
                    kind: QuestionKind::Mc,
                    text: question,
                    options,
                    correct_option_index: Some(index),
                })
            } else {
                Ok(TestingResponse::Question {
                    kind: QuestionKind::Open,
                    text: question,
                    options: Vec::new(),
                    correct_option_index: None,
                })
            }
        }
        "FEEDBACK" => {
            let evaluation = match parsed.evaluation.as_deref() {
                Some(e) if e.eq_ignore_ascii_case("CORRECT") => Evaluation::Correct,
                _ => Evaluation::Incorrect,
            };
            Ok(TestingResponse::Feedback {
                evaluation,
                text: parsed.feedback.unwrap_or_default(),
            })
        }
        other => Err(ValidationError::Malformed(format!(
            "unknown response type: {}",
            other
        ))),
    }
}
