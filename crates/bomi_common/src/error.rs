//! Error types for Bomi.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BomiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No match: {0}")]
    NoMatch(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BomiError {
    pub fn code(&self) -> i32 {
        match self {
            BomiError::Validation(_) => -32001,
            BomiError::NoMatch(_) => -32002,
            BomiError::Backend(_) => -32003,
            BomiError::Config(_) => -32004,
            BomiError::Io(_) => -32005,
            BomiError::Json(_) => -32700,
        }
    }

    /// Generic user-facing message in Korean. Raw errors never reach the
    /// rendering layer; this is what the dialogue boundary shows instead.
    pub fn user_message(&self) -> String {
        match self {
            BomiError::Validation(msg) => format!("요청을 처리할 수 없습니다: {}", msg),
            BomiError::NoMatch(msg) => msg.clone(),
            BomiError::Backend(_) => {
                "서버와 통신 중 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.".to_string()
            }
            _ => "오류가 발생했습니다. 잠시 후 다시 시도해 주세요.".to_string(),
        }
    }
}
