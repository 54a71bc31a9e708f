//! Domain error types.

/// Top-level error type for stratlab.
#[derive(Debug, thiserror::Error)]
pub enum StratlabError {
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

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("price data error: {reason}")]
    DataSource { reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid price series: {reason}")]
    InvalidPriceSeries { reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("{what} length {actual} does not match price series length {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("strategy {name} failed: {reason}")]
    StrategyFailed { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratlabError> for std::process::ExitCode {
    fn from(err: &StratlabError) -> Self {
        let code: u8 = match err {
            StratlabError::Io(_) => 1,
            StratlabError::ConfigParse { .. }
            | StratlabError::ConfigMissing { .. }
            | StratlabError::ConfigInvalid { .. } => 2,
            StratlabError::DataSource { .. } => 3,
            StratlabError::UnknownStrategy { .. } => 4,
            StratlabError::NoData { .. }
            | StratlabError::InvalidPriceSeries { .. }
            | StratlabError::InsufficientData { .. } => 5,
            StratlabError::LengthMismatch { .. } | StratlabError::StrategyFailed { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
