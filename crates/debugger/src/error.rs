//! Top-level debugger errors.

use crate::marshal::MarshalError;
use thiserror::Error;

/// Errors surfaced by `Emulator::reset`. Stepping never fails outward;
/// VM faults are reported as the `Exception` session state instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DebuggerError {
    /// `reset` was called before an executing account was bound.
    #[error("no bytecode bound; set an executing account first")]
    BytecodeMissing,

    #[error(transparent)]
    Marshal(#[from] MarshalError),
}
