//! Error taxonomy for report construction and rendering.
//!
//! Mirrors the closed set of status codes the upstream C library returns
//! from every API call (`MU_OK`, `MU_ERRPARAM`, `MU_ERRSRC`, `MU_ERRFILE`),
//! plus the writer short-circuit, which in this port is a normal `Err`
//! instead of a distinguished return value threaded through every call.

use thiserror::Error;

/// Errors that can occur while building or rendering a [`crate::Report`].
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum MusubiError {
    /// A builder call was made out of order or with an invalid argument,
    /// e.g. `message`/`order`/`priority` with no open label, or `render`
    /// given a source id that does not exist.
    #[error("invalid parameter: {0}")]
    Param(String),

    /// A label's `src_id` (or the header source id passed to `render`) does
    /// not refer to any source attached to the report.
    #[error("source id {0} is out of range")]
    Source(u32),

    /// A file-backed source could not be opened or read.
    #[error("file source error: {0}")]
    File(String),

    /// The writer callback returned a non-zero status, which aborts the
    /// render immediately. The value is surfaced unchanged.
    #[error("writer aborted render with status {0}")]
    Writer(i32),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MusubiError>;
