use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        EngineError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(entity: &'static str, id: &str) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable error code used on the IPC envelope.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation_failed",
            EngineError::NotFound { .. } => "not_found",
            EngineError::Storage(_) => "db_error",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            EngineError::Validation { details, .. } => details.clone(),
            EngineError::NotFound { entity, id } => {
                Some(serde_json::json!({ "entity": entity, "id": id }))
            }
            EngineError::Storage(_) => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
