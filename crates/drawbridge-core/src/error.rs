use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrawbridgeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Scene error: {0}")]
    Scene(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Property '{key}' not supported on {kind} nodes")]
    PropertyNotSupported { kind: String, key: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown element type: {0}")]
    UnknownElementType(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Font not available: {family} {style}")]
    FontNotAvailable { family: String, style: String },

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DrawbridgeError>;
