//! Error taxonomy for the enhancement core.
//!
//! `UnknownParameter`, `TypeMismatch`, and `ImageShapeInvalid` are hard
//! errors: `Engine::process` returns them before any stage runs.
//! `StageFailed` and `AutoTuneFailed` are recovered locally by the engine
//! and surfaced as warnings on the result envelope instead. `OutOfRange`
//! is always a warning; the clamped value is used regardless.

use crate::schema::StageId;
use thiserror::Error;

/// A parameter value's kind, used for `TypeMismatch` reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Choice,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Choice => "choice",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("unknown parameter key: {0}")]
    UnknownParameter(String),

    #[error("value {value} for `{key}` out of range, clamped to [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("type mismatch for `{key}`: expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("stage {stage:?} failed and was skipped: {cause}")]
    StageFailed { stage: StageId, cause: String },

    #[error("auto-tune for stage {stage:?} failed and was skipped: {cause}")]
    AutoTuneFailed { stage: StageId, cause: String },

    #[error("operation cancelled after stage {last_completed:?}")]
    Cancelled { last_completed: Option<StageId> },

    #[error("invalid image shape: expected {expected:?}, got {got:?}")]
    ImageShapeInvalid {
        expected: (u32, u32, u8),
        got: (u32, u32, u8),
    },

    #[error("quality analysis failed: {0}")]
    QualityAnalysisFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
