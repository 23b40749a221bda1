use thiserror::Error;

/// Main error type for the neurotune optimizer layer
#[derive(Error, Debug)]
pub enum NtError {
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Algorithm error: {0}")]
    Algorithm(#[from] AlgorithmError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while declaring tunable parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter {name}: lower bound {lower} is greater than upper bound {upper}")]
    InvertedBounds { name: String, lower: f64, upper: f64 },

    #[error("Parameter {name}: bounds must be finite, got [{lower}, {upper}]")]
    NonFiniteBounds { name: String, lower: f64, upper: f64 },

    #[error("Parameter {name}: range [{lower}, {upper}] is too wide to sample")]
    UnsampleableRange { name: String, lower: f64, upper: f64 },
}

/// Misuse of an optimization algorithm by its caller.
///
/// Every variant is a programming or configuration defect. None of them is
/// used to report an evaluation that failed numerically; those are scored
/// with the bad-fitness sentinel instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("Algorithm '{algorithm}' has no bound parameter space; call bind_parameters first")]
    UnconfiguredParameterSpace { algorithm: String },

    #[error("Seed {index} has {actual} genes, genome size is {expected}")]
    SeedLengthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Seed {index}: gene {dimension} = {value} is outside [{lower}, {upper}]")]
    SeedOutOfBounds {
        index: usize,
        dimension: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Candidate has {actual} genes, genome size is {expected}")]
    CandidateLength { expected: usize, actual: usize },

    #[error("Candidate gene {dimension} = {value} is outside [{lower}, {upper}]")]
    CandidateOutOfBounds {
        dimension: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Population size {population_size} cannot hold {seeds} seeds")]
    PopulationTooSmall { population_size: usize, seeds: usize },

    #[error("Algorithm '{algorithm}' was constructed without an evaluator")]
    MissingEvaluator { algorithm: String },

    #[error("Invalid configuration for '{algorithm}': {message}")]
    InvalidConfig { algorithm: String, message: String },
}

/// Result type alias for neurotune operations
pub type NtResult<T> = Result<T, NtError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::NtError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::NtError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::NtError::Config(format!($($arg)*))
    };
}
