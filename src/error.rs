use thiserror::Error;

/// Failure kinds of the analysis pipeline.
///
/// Public entry points never return these to callers: they log the error and
/// degrade to an empty or zero result. Internal helpers use them so the log
/// line says which stage gave up.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not parse '{0}'")]
    ParseFailure(String),

    #[error("unrecognized hash-rate unit '{0}'")]
    UnitUnrecognized(String),

    #[error("'{0}' does not match any known ticker")]
    NoMatch(String),

    #[error("unexpected OCR result shape: {0}")]
    EngineShapeMismatch(String),

    #[error("OCR engine failed: {0}")]
    EngineFailed(String),
}
