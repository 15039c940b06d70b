//! Error types.
//!
//! - `HspError` is what the library returns (evaluator, search, ingest, catalog).
//! - `AppError` is what the `hsp` binary reports: a message plus a process exit code.

use thiserror::Error;

/// Library error.
///
/// Non-convergence is not represented here: a search that runs out of iterations
/// still returns a `FitResult` with `converged == false`.
#[derive(Debug, Error)]
pub enum HspError {
    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("Solvent panel has no measurements.")]
    EmptyPanel,

    /// All measurements carry the same label, so any sphere containing (or
    /// excluding) everything is a perfect fit.
    #[error("Degenerate solvent panel: all {count} measurements are labeled {label}.")]
    DegeneratePanel { count: usize, label: &'static str },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate solvent identifier '{0}'.")]
    DuplicateIdentifier(String),

    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl HspError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Exit code used by the binary for this error.
    ///
    /// - 2: bad input, configuration, or files
    /// - 3: data that cannot be fitted
    /// - 4: candidate/numeric failures
    pub fn exit_code(&self) -> u8 {
        match self {
            HspError::EmptyPanel | HspError::DegeneratePanel { .. } => 3,
            HspError::InvalidCandidate(_) => 4,
            HspError::InvalidInput(_)
            | HspError::DuplicateIdentifier(_)
            | HspError::InvalidConfig(_)
            | HspError::Io { .. }
            | HspError::Csv(_)
            | HspError::Json(_)
            | HspError::Toml(_) => 2,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<HspError> for AppError {
    fn from(err: HspError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
