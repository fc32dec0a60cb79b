#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse diagram markup: {0}")]
    Markup(#[from] roxmltree::Error),
    #[error("no root element found")]
    NoRootElement,
    #[error("viewer has no container attached")]
    MissingContainer,
    #[error("diagram markup is empty")]
    EmptyContent,
    #[error("diagram content has no measurable geometry")]
    EmptyBounds,
    #[error("metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid viewBox: {value:?}")]
    InvalidViewBox { value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
