//! 测验核心：会话状态、答案解析、结构化输出校验、状态机与渲染

pub mod answer;
pub mod engine;
pub mod format;
pub mod prompts;
pub mod response;
pub mod session;

pub use answer::{option_label, parse_option_letter};
pub use engine::TutorEngine;
pub use response::{Evaluation, TestingResponse, ValidationError};
pub use session::{ChatMode, QuestionKind, QuizSession, SessionRegistry};
