use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Log record is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Log record is empty.")]
    Empty,

    #[error("Log record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Log record must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}
