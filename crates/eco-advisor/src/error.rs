use eco_common::error::CommonError;
use eco_common::openai::OpenAiClientError;
use eco_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    OpenAi(#[from] OpenAiClientError),

    #[error("fact extraction failed: {0}")]
    Extraction(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
