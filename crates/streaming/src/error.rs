use foundation::math::ProjectionError;

/// Failure of a single fetch task. Failures are isolated per request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    /// Transport failure (`status: None`) or a non-success HTTP status.
    #[error("network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// The response body did not match the expected search contract.
    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),
}

impl LoadError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LoadError::Network { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Network {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Parse(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid line color {0:?} (expected #rrggbb or #rrggbbaa)")]
    InvalidColor(String),

    #[error("invalid tile size {0} (must be > 0)")]
    InvalidTileSize(u32),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxError {
    #[error("bbox requires exactly 4 comma-separated numbers, got {0}")]
    WrongArity(usize),

    #[error("bbox value is not a number: {0:?}")]
    NotANumber(String),

    #[error("bbox minimum exceeds maximum")]
    Inverted,
}
