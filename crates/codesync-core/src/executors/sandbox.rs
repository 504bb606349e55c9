//! The sandbox facade: probe once, pick a path per request, never fail.

use super::docker::DockerExecutor;
use super::local::LocalExecutor;
use super::{CodeExecutor, SandboxConfig};
use crate::errors::SandboxError;

/// Execution entry point for untrusted code.
///
/// Construction probes the isolation backend exactly once; the outcome is
/// held as an explicit capability for the process lifetime rather than
/// re-checked per request. Every failure mode of either path is flattened
/// into the returned (stdout, stderr) pair — `execute` has no error
/// return.
pub struct Sandbox {
    docker: Option<DockerExecutor>,
    fallback: LocalExecutor,
}

impl Sandbox {
    /// Probe the Docker daemon and build the sandbox around the result.
    pub async fn probe(config: SandboxConfig) -> Self {
        let fallback = LocalExecutor::new(config.timeout_seconds);
        match DockerExecutor::connect(config.clone()).await {
            Ok(executor) => {
                log::info!(
                    "isolation backend available; executing in containers from '{}'",
                    config.image
                );
                Self {
                    docker: Some(executor),
                    fallback,
                }
            }
            Err(e) => {
                log::warn!(
                    "could not connect to Docker daemon ({}); falling back to insecure local execution",
                    e
                );
                Self {
                    docker: None,
                    fallback,
                }
            }
        }
    }

    /// Build a sandbox that skips the probe and always executes locally.
    pub fn without_isolation(timeout_seconds: u64) -> Self {
        Self {
            docker: None,
            fallback: LocalExecutor::new(timeout_seconds),
        }
    }

    /// Whether the isolated path is in use.
    pub fn is_isolated(&self) -> bool {
        self.docker.is_some()
    }

    /// Run `code` and return (stdout, stderr).
    ///
    /// User-code failures come back verbatim; a timeout comes back as the
    /// fixed limit message; sandbox-infrastructure failures are prefixed
    /// so they cannot be mistaken for program output.
    pub async fn execute(&self, code: &str) -> (String, String) {
        let result = match &self.docker {
            Some(executor) => executor.execute_code(code).await,
            None => {
                log::debug!("executing in degraded-security mode (no isolation)");
                self.fallback.execute_code(code).await
            }
        };

        match result {
            Ok(output) => (output.stdout, output.stderr),
            Err(SandboxError::ContainerFailed { stdout, stderr, .. }) => (stdout, stderr),
            Err(SandboxError::Timeout(limit)) => (
                String::new(),
                format!("Execution timed out ({}s limit).", limit),
            ),
            Err(e) if self.docker.is_some() => {
                log::error!("sandbox failure: {}", e);
                (String::new(), format!("Sandbox error: {}", e))
            }
            Err(e) => {
                log::error!("local execution failure: {}", e);
                (String::new(), format!("Local execution failed: {}", e))
            }
        }
    }
}
