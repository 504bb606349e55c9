//! Error types for the sandboxed execution pipeline.
//!
//! Every failure a sandbox run can produce is represented here so the
//! facade can flatten it into the caller-facing (stdout, stderr)
//! contract. A non-zero exit of the executed program is a user-code
//! failure and carries the captured streams; everything else is
//! infrastructure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Docker (bollard) error: {0}")]
    Docker(#[from] bollard::errors::Error),
    #[error("program exited with code {exit_code:?}:\nStdout: {stdout}\nStderr: {stderr}")]
    ContainerFailed {
        exit_code: Option<i64>,
        stdout: String,
        stderr: String,
    },
    #[error("I/O error during sandbox operation: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 decoding error from slice: {0}")]
    StrUtf8Error(#[from] std::str::Utf8Error),
    #[error("could not stage script artifact: {0}")]
    TempFileError(String),
    #[error("sandbox infrastructure failure: {0}")]
    Infrastructure(String),
    #[error("execution timed out ({0}s limit)")]
    Timeout(u64),
}
