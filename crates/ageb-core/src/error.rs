use thiserror::Error;

/// Errors raised while building lookup structures or running a pass.
///
/// Only table and configuration errors are fatal. `InvalidArgument` is an
/// internal signal from the distributor; the cascade checks for empty
/// candidate lists first, so it never reaches a caller through a pass.
#[derive(Debug, Error)]
pub enum AgebError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid {table} row {row}: {reason}")]
    InvalidTable {
        table: &'static str,
        row: usize,
        reason: String,
    },

    #[error("{0} table has no usable rows")]
    EmptyTable(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgebError>;
