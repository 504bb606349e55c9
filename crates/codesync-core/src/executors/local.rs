use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{CodeExecutor, ExecutionOutput};
use crate::errors::SandboxError;

/// Direct local execution, used only when no isolation backend is
/// reachable. Applies the same wall-clock limit but provides no
/// memory/CPU/network isolation — callers must treat this path as
/// degraded-security mode.
pub struct LocalExecutor {
    timeout_seconds: u64,
}

impl LocalExecutor {
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }
}

#[async_trait]
impl CodeExecutor for LocalExecutor {
    async fn execute_code(&self, code: &str) -> Result<ExecutionOutput, SandboxError> {
        let child = Command::new("python3")
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // A timeout drops the wait future, and kill_on_drop reaps the
        // child; a runaway script cannot outlive the request.
        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_seconds),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| SandboxError::Timeout(self.timeout_seconds))??;

        // Non-zero exit is not an error here: the interpreter's own
        // stderr (tracebacks, syntax errors) is the user-facing result.
        Ok(ExecutionOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
