//! Docker-backed container lifecycle and exec primitives.

use std::collections::HashMap;
use std::time::Duration;

use bollard::container::{Config as ContainerConfig, CreateContainerOptions, RemoveContainerOptions, StopContainerOptions};
use bollard::errors::Error as DockerApiError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::SandboxConfig;
use crate::error::SandboxError;

pub struct DockerBackend {
    docker: Docker,
    config: SandboxConfig,
    container_id: Option<String>,
}

impl DockerBackend {
    pub fn connect(config: SandboxConfig) -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker, config, container_id: None })
    }

    /// Launch the sandbox container, binding `workspace_dir` to `/workspace`.
    pub async fn start(&mut self, container_name: &str, workspace_dir: &str) -> Result<(), SandboxError> {
        info!(image = %self.config.image, %container_name, "DockerBackend::start");

        let host_config = HostConfig {
            memory: Some(self.config.memory_limit_bytes),
            cpu_quota: Some((self.config.cpu_limit * 100_000.0) as i64),
            cpu_period: Some(100_000),
            binds: Some(vec![format!("{}:/workspace:rw", workspace_dir)]),
            auto_remove: Some(true),
            network_mode: Some("bridge".to_string()),
            ..Default::default()
        };

        let mut env = HashMap::new();
        env.insert("PYTHONPATH", "/opt/tools:/workspace");

        let options = CreateContainerOptions { name: container_name, platform: None };
        let config = ContainerConfig {
            image: Some(self.config.image.as_str()),
            working_dir: Some("/workspace"),
            host_config: Some(host_config),
            open_stdin: Some(true),
            tty: Some(true),
            env: Some(env.into_iter().map(|(k, v)| format!("{k}={v}")).collect()),
            ..Default::default()
        };

        let created = match self.docker.create_container(Some(options), config).await {
            Ok(c) => c,
            Err(DockerApiError::DockerResponseServerError { status_code: 404, .. }) => {
                return Err(SandboxError::ImageMissing(self.config.image.clone()));
            }
            Err(e) => return Err(SandboxError::Docker(e)),
        };

        self.docker.start_container::<String>(&created.id, None).await?;
        self.container_id = Some(created.id);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), SandboxError> {
        let Some(id) = self.container_id.take() else { return Ok(()) };
        debug!(%id, "DockerBackend::stop");
        if let Err(e) = self.docker.stop_container(&id, Some(StopContainerOptions { t: 5 })).await {
            warn!(%id, error = %e, "DockerBackend::stop: stop_container failed, attempting remove anyway");
        }
        let _ = self.docker.remove_container(&id, Some(RemoveContainerOptions { force: true, ..Default::default() })).await;
        Ok(())
    }

    /// Run a command inside the container and return its combined stdout/stderr.
    pub async fn exec(&self, cmd: Vec<&str>, timeout: Duration) -> Result<(i64, String), SandboxError> {
        let id = self.container_id.as_deref().ok_or_else(|| SandboxError::Unavailable("container not started".to_string()))?;

        let exec = self
            .docker
            .create_exec(id, CreateExecOptions { cmd: Some(cmd), attach_stdout: Some(true), attach_stderr: Some(true), ..Default::default() })
            .await?;

        let run = self.docker.start_exec(&exec.id, None);
        let output_fut = async {
            let mut stdout = String::new();
            let mut stderr = String::new();
            if let StartExecResults::Attached { mut output, .. } = run.await? {
                while let Some(chunk) = output.next().await {
                    match chunk? {
                        bollard::container::LogOutput::StdOut { message } => stdout.push_str(&String::from_utf8_lossy(&message)),
                        bollard::container::LogOutput::StdErr { message } => stderr.push_str(&String::from_utf8_lossy(&message)),
                        _ => {}
                    }
                }
            }
            Ok::<_, DockerApiError>((stdout, stderr))
        };

        let (stdout, stderr) = match tokio::time::timeout(timeout, output_fut).await {
            Ok(result) => result?,
            Err(_) => return Err(SandboxError::ExecTimeout(timeout)),
        };

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        let exit_code = inspect.exit_code.unwrap_or(-1);

        let mut combined = stdout;
        if !stderr.is_empty() {
            combined.push_str("\nSTDERR:\n");
            combined.push_str(&stderr);
        }

        Ok((exit_code, combined))
    }
}
