use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::ContainerCreateBody;
use bollard::query_parameters::{
    CreateContainerOptions as BollardCreateContainerOptionsQuery,
    LogsOptions as BollardLogsOptionsQuery,
    RemoveContainerOptions as BollardRemoveContainerOptionsQuery,
    StartContainerOptions as BollardStartContainerOptionsQuery,
    StopContainerOptions as BollardStopContainerOptionsQuery,
    WaitContainerOptions as BollardWaitContainerOptionsQuery,
};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::default::Default;
use tempfile::Builder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{CodeExecutor, ExecutionOutput, SandboxConfig};
use crate::errors::SandboxError;

const CONTAINER_WORK_DIR: &str = "/work";

/// Isolated execution path: each request runs in a fresh container built
/// from a pinned minimal image, with the script bind-mounted read-only,
/// no network, and hard memory/CPU ceilings. The container is removed on
/// every exit path.
pub struct DockerExecutor {
    docker: Docker,
    config: SandboxConfig,
}

impl DockerExecutor {
    /// Connect to the local Docker daemon and verify it is reachable.
    ///
    /// This is the one-shot availability probe: callers decide at startup
    /// whether isolation exists and keep the handle for the process
    /// lifetime.
    pub async fn connect(config: SandboxConfig) -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_local_defaults()?;
        docker.ping().await?;
        Ok(Self { docker, config })
    }

    async fn collect_logs(&self, container_id: &str) -> Result<ExecutionOutput, SandboxError> {
        let mut output_stream = self.docker.logs(
            container_id,
            Some(BollardLogsOptionsQuery {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(log_result) = output_stream.next().await {
            match log_result? {
                LogOutput::StdOut { message } => stdout.push_str(std::str::from_utf8(&message)?),
                LogOutput::StdErr { message } => stderr.push_str(std::str::from_utf8(&message)?),
                _ => {}
            }
        }

        Ok(ExecutionOutput { stdout, stderr })
    }

    /// Best-effort teardown. Removal failures are logged, not propagated:
    /// the execution outcome is already decided by the time we get here.
    async fn remove_container(&self, container_id: &str) {
        let options = Some(BollardRemoveContainerOptionsQuery {
            force: true,
            ..Default::default()
        });
        if let Err(e) = self.docker.remove_container(container_id, options).await {
            log::warn!("failed to remove container {}: {}", container_id, e);
        }
    }
}

#[async_trait]
impl CodeExecutor for DockerExecutor {
    async fn execute_code(&self, code: &str) -> Result<ExecutionOutput, SandboxError> {
        // Stage the script in a scoped temp dir; RAII deletes it on every
        // exit path, including errors.
        let temp_dir = Builder::new().prefix("codesync-exec-").tempdir()?;
        let host_dir = temp_dir
            .path()
            .to_str()
            .ok_or_else(|| SandboxError::TempFileError("Invalid temp path".to_string()))?
            .to_string();

        let script_filename = format!("script_{}.py", Uuid::new_v4());
        let host_script_path = temp_dir.path().join(&script_filename);

        let mut file = fs::File::create(&host_script_path).await?;
        file.write_all(code.as_bytes()).await?;
        file.flush().await?;

        let script_path_in_container = format!("{}/{}", CONTAINER_WORK_DIR, script_filename);

        let options = Some(BollardCreateContainerOptionsQuery {
            name: Some(format!("codesync-exec-{}", Uuid::new_v4())),
            ..Default::default()
        });

        let body = ContainerCreateBody {
            image: Some(self.config.image.clone()),
            cmd: Some(vec!["python".to_string(), script_path_in_container]),
            working_dir: Some(CONTAINER_WORK_DIR.to_string()),
            host_config: Some(bollard::models::HostConfig {
                binds: Some(vec![format!("{}:{}:ro", host_dir, CONTAINER_WORK_DIR)]),
                network_mode: Some("none".to_string()),
                memory: Some(self.config.memory_limit_bytes),
                cpu_quota: Some(self.config.cpu_quota),
                ..Default::default()
            }),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let container = self.docker.create_container(options, body).await?;
        if let Err(e) = self
            .docker
            .start_container(&container.id, None::<BollardStartContainerOptionsQuery>)
            .await
        {
            self.remove_container(&container.id).await;
            return Err(e.into());
        }

        let mut wait_stream = self
            .docker
            .wait_container(&container.id, None::<BollardWaitContainerOptionsQuery>);
        let timeout_future = tokio::time::sleep(tokio::time::Duration::from_secs(
            self.config.timeout_seconds,
        ));

        let wait_outcome = tokio::select! {
            res = wait_stream.next() => res,
            _ = timeout_future => {
                log::warn!("execution timed out for container {}", container.id);
                let _ = self
                    .docker
                    .stop_container(&container.id, None::<BollardStopContainerOptionsQuery>)
                    .await;
                self.remove_container(&container.id).await;
                return Err(SandboxError::Timeout(self.config.timeout_seconds));
            }
        };

        // A non-zero exit surfaces either as a wait response with a
        // status code or as a dedicated wait error; both are user-code
        // failures, not sandbox failures.
        let exit_code = match wait_outcome {
            Some(Ok(response)) => response.status_code,
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => code,
            Some(Err(e)) => {
                self.remove_container(&container.id).await;
                return Err(e.into());
            }
            None => {
                self.remove_container(&container.id).await;
                return Err(SandboxError::Infrastructure(
                    "container wait stream ended unexpectedly".to_string(),
                ));
            }
        };

        let logs = self.collect_logs(&container.id).await;
        self.remove_container(&container.id).await;
        let output = logs?;

        if exit_code != 0 {
            return Err(SandboxError::ContainerFailed {
                exit_code: Some(exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires a local Docker daemon and the pinned Python image
    async fn hello_world_runs_in_container() {
        let executor = DockerExecutor::connect(SandboxConfig::default())
            .await
            .expect("Docker daemon not reachable");
        let output = executor.execute_code("print('hello')").await.unwrap();
        assert!(output.stdout.contains("hello"));
        assert!(output.stderr.is_empty());
    }
}
