// src/core/error.rs

//! Error handling logic

use std::fmt;
use thiserror::Error;

use crate::vm::VarId;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, InterpError>;

/// Recognised features the interpreter deliberately does not implement.
///
/// Callers can match on these to tell "not yet implemented" apart from
/// "invalid input".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedFeature {
    /// Shot vectors such as `[100, 100, 500]`.
    PartitionedShots,
    /// An adjoint transform wrapping a whole sub-program.
    AdjointTransform,
    /// A controlled transform wrapping a whole sub-program.
    ControlledTransform,
    /// Terminal statistics computed over mid-measurement outcomes.
    MidMeasurePostprocessing,
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnsupportedFeature::PartitionedShots => "partitioned shots",
            UnsupportedFeature::AdjointTransform => "adjoint transform of a sub-program",
            UnsupportedFeature::ControlledTransform => "controlled transform of a sub-program",
            UnsupportedFeature::MidMeasurePostprocessing => "post-processing of mid-measurement outcomes",
        };
        f.write_str(name)
    }
}

/// Errors raised while building, validating or interpreting a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpError {
    /// An equation read a variable that was never bound in its frame.
    #[error("unbound variable {var}")]
    UnboundVariable {
        /// The variable that could not be resolved.
        var: VarId,
    },

    /// A recognised but unimplemented primitive or configuration.
    #[error("not implemented: {0}")]
    Unsupported(UnsupportedFeature),

    /// The execution state was touched outside of an invocation.
    #[error("execution state error: {message}")]
    StateLifecycle {
        /// StateLifecycle failure message
        message: String,
    },

    /// Raised by the shot-sampling collaborator.
    #[error("sampling error: {message}")]
    Sampling {
        /// Sampling failure message
        message: String,
    },

    /// Rejected interpreter configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// InvalidConfig failure message
        message: String,
    },

    /// An applied operation is inconsistent with the current state or wires.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// InvalidOperation failure message
        message: String,
    },

    /// A measurement cannot be computed in the current mode.
    #[error("invalid measurement: {message}")]
    InvalidMeasurement {
        /// InvalidMeasurement failure message
        message: String,
    },

    /// A state vector failed validation.
    #[error("invalid state: {message}")]
    InvalidState {
        /// InvalidState failure message
        message: String,
    },

    /// A value had a different type than the consumer required.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Type name of the value actually found.
        found: &'static str,
    },

    /// Wrong number of values passed to or returned from a frame or primitive.
    #[error("arity mismatch in {context}: expected {expected}, found {found}")]
    ArityMismatch {
        /// Where the mismatch happened.
        context: String,
        /// Expected count.
        expected: usize,
        /// Actual count.
        found: usize,
    },

    /// A named primitive has no handler in the dispatch table.
    #[error("no handler registered for primitive '{name}'")]
    UnknownPrimitive {
        /// The primitive name that was looked up.
        name: String,
    },

    /// The program structure itself is inconsistent.
    #[error("malformed program: {message}")]
    MalformedProgram {
        /// MalformedProgram failure message
        message: String,
    },
}

impl InterpError {
    /// Returns the unsupported feature if this error signals one.
    pub fn unsupported_feature(&self) -> Option<UnsupportedFeature> {
        match self {
            InterpError::Unsupported(feature) => Some(*feature),
            _ => None,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        InterpError::MalformedProgram { message: message.into() }
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        InterpError::InvalidOperation { message: message.into() }
    }

    pub(crate) fn invalid_measurement(message: impl Into<String>) -> Self {
        InterpError::InvalidMeasurement { message: message.into() }
    }
}
