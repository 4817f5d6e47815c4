use crate::session::SessionError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("usage: pictor <script.json>")]
    Usage,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to encode summary: {0}")]
    Summary(#[from] serde_json::Error),
}
