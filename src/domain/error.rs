//! Domain error types.

/// Top-level error type for regimechain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegimeChainError {
    #[error("invalid thresholds (bull={bull}, bear={bear}): {reason}")]
    InvalidThreshold { bull: f64, bear: f64, reason: String },

    #[error("insufficient data for {operation}: have {have}, need {need}")]
    InsufficientData {
        operation: String,
        have: usize,
        need: usize,
    },

    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("stationary distribution did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for RegimeChainError {
    fn from(err: std::io::Error) -> Self {
        RegimeChainError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<&RegimeChainError> for std::process::ExitCode {
    fn from(err: &RegimeChainError) -> Self {
        let code: u8 = match err {
            RegimeChainError::Io { .. } => 1,
            RegimeChainError::ConfigParse { .. }
            | RegimeChainError::ConfigMissing { .. }
            | RegimeChainError::ConfigInvalid { .. } => 2,
            RegimeChainError::Data { .. } => 3,
            RegimeChainError::InvalidThreshold { .. } | RegimeChainError::InvalidRange { .. } => 4,
            RegimeChainError::InsufficientData { .. } => 5,
            RegimeChainError::NoConvergence { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
