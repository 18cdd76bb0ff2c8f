use thiserror::Error;

/// Every way a panel operation can fail. None of them are fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("missing route parameter: {field}")]
    MissingSelection { field: &'static str },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("upload response is missing fileId")]
    MissingFileId,

    #[error("admin access required")]
    ReadOnly,

    #[error("no file selected for upload")]
    NothingStaged,

    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error("failed to build upload form: {0}")]
    Form(String),
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::Decode(err.to_string())
    }
}
