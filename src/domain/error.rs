//! Domain error types.

/// Top-level error type for the research pipeline.
///
/// Every per-asset failure is reported through this enum so the pipeline can
/// skip the asset and carry on with the next one.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("no trades taken for {ticker}: win ratio is undefined")]
    NoTrades { ticker: String },

    #[error("insufficient data: have {rows} rows, need {minimum}")]
    InsufficientData { rows: usize, minimum: usize },

    #[error("insufficient features: have {available}, need {minimum}")]
    InsufficientFeatures { available: usize, minimum: usize },

    #[error("feature engineering failed: {reason}")]
    FeatureEngineering { reason: String },

    #[error("model fitting failed: {reason}")]
    ModelFitting { reason: String },

    #[error("{service} failed after {attempts} attempt(s): {reason}")]
    ExternalService {
        service: String,
        attempts: u32,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn model_fitting(reason: impl Into<String>) -> Self {
        PipelineError::ModelFitting {
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PipelineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&PipelineError> for std::process::ExitCode {
    fn from(err: &PipelineError) -> Self {
        let code: u8 = match err {
            PipelineError::Io(_) => 1,
            PipelineError::ConfigParse { .. }
            | PipelineError::ConfigMissing { .. }
            | PipelineError::ConfigInvalid { .. } => 2,
            PipelineError::DataSource { .. } => 3,
            PipelineError::NoData { .. }
            | PipelineError::NoTrades { .. }
            | PipelineError::InsufficientData { .. }
            | PipelineError::InsufficientFeatures { .. } => 5,
            PipelineError::FeatureEngineering { .. } | PipelineError::ModelFitting { .. } => 6,
            PipelineError::ExternalService { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
