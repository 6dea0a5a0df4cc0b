//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for ticksim.
#[derive(Debug, thiserror::Error)]
pub enum TicksimError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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
    RuleParse(#[from] ParseError),

    #[error("unknown column or indicator: {name}")]
    UnknownColumn { name: String },

    #[error("unknown trade direction: {value}")]
    UnknownDirection { value: String },

    #[error("unknown sampling method: {value}")]
    UnknownSamplingMethod { value: String },

    #[error("length mismatch: {field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid price series: {reason}")]
    InvalidSeries { reason: String },

    #[error("invalid dataset {source_name}: {reason}")]
    InvalidDataset { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TicksimError> for std::process::ExitCode {
    fn from(err: &TicksimError) -> Self {
        let code: u8 = match err {
            TicksimError::Io(_) => 1,
            TicksimError::ConfigParse { .. }
            | TicksimError::ConfigMissing { .. }
            | TicksimError::ConfigInvalid { .. } => 2,
            TicksimError::Database { .. } | TicksimError::DatabaseQuery { .. } => 3,
            TicksimError::RuleParse(_)
            | TicksimError::UnknownColumn { .. }
            | TicksimError::UnknownDirection { .. }
            | TicksimError::UnknownSamplingMethod { .. } => 4,
            TicksimError::LengthMismatch { .. }
            | TicksimError::InvalidSeries { .. }
            | TicksimError::InvalidDataset { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
