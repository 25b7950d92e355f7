//! 回复渲染：会话状态 + 校验过的结构化回复 -> 展示文本
//!
//! 纯函数，不触碰任何状态；在引擎更新会话之后调用。

use crate::quiz::answer::option_label;
use crate::quiz::response::{Evaluation, TestingResponse};
use crate::quiz::session::{QuestionKind, QuizSession};

/// 渲染一次测试模式回合的用户可见文本
pub fn render(session: &QuizSession, response: &TestingResponse) -> String {
    let mut out = String::new();

    if let TestingResponse::Feedback { evaluation, text } = response {
        let icon = match evaluation {
            Evaluation::Correct => "✅",
            Evaluation::Incorrect => "❌",
        };
        out.push_str(&format!("{} **{}**\n", icon, evaluation.as_str()));
        out.push_str(text);
        out.push_str("\n\n---\n\n");
    }

    if let TestingResponse::Question { text, options, .. } = response {
        if session.waiting_for_answer {
            if let Some(kind) = session.last_question_type {
                out.push_str(&format!("💡 **Question ({}):**\n{}\n", kind, text));
            }
        }

        match session.last_question_type {
            Some(QuestionKind::Mc) if session.waiting_for_answer && !options.is_empty() => {
                out.push('\n');
                for (i, option) in options.iter().enumerate() {
                    out.push_str(&format!("**{})** {}\n", option_label(i), option));
                }
                out.push_str("\n👇 **Select the correct answer (A, B, C...).**");
            }
            Some(QuestionKind::Open) if session.waiting_for_answer => {
                out.push_str("\n✍️ **Type your answer below.**");
            }
            _ => {}
        }
    } else if !session.waiting_for_answer {
        // 反馈之后回到出题态：邀请下一轮
        out.push_str("🚀 Ready for the next question. Say anything to continue.");
    }

    out
}
