use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid json")]
    InvalidJson,

    #[error("missing code")]
    MissingCode,

    #[error("missing question_code")]
    MissingQuestionCode,

    #[error("missing patch")]
    MissingPatch,

    #[error("method not allowed")]
    MethodNotAllowed { method: String },

    #[error("{message}")]
    StoreNotConfigured { message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },
}

/// 錯誤分類，HTTP 層據此決定狀態碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 請求內容不合法 (400)
    Validation,
    /// 不支援的 HTTP 方法 (405)
    Method,
    /// 部署或設定問題 (500，回傳 JSON)
    Configuration,
    /// 儲存層失敗 (500，不保證 JSON 格式)
    Storage,
}

impl PatchError {
    pub fn store_not_configured() -> Self {
        PatchError::StoreNotConfigured {
            message: "database binding 'DB' is not configured".to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PatchError::InvalidJson
            | PatchError::MissingCode
            | PatchError::MissingQuestionCode
            | PatchError::MissingPatch => ErrorCategory::Validation,
            PatchError::MethodNotAllowed { .. } => ErrorCategory::Method,
            PatchError::StoreNotConfigured { .. }
            | PatchError::ConfigError { .. }
            | PatchError::InvalidConfigValueError { .. }
            | PatchError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PatchError::DatabaseError(_)
            | PatchError::SerializationError(_)
            | PatchError::IoError(_)
            | PatchError::StoreError { .. } => ErrorCategory::Storage,
        }
    }

    /// 是否為呼叫端造成的錯誤 (不需記錄為伺服器錯誤)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Method
        )
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
