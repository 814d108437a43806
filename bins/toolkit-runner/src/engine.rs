//! Action Engine - Abstraction for Invoking the Toolkit
//!
//! **Core Responsibility:**
//! Run the containerized toolkit action once against a host workspace and
//! report its exit status.
//!
//! **Architectural Boundary:**
//! - Engine knows HOW to start the container (Docker API, docker CLI, ...)
//! - Engine does NOT know success criteria
//! - Engine does NOT touch workspace artifacts
//! - Container output is streamed through, never captured for judging
//!
//! Production uses DockerEngine; tests inject scripted engines.

use anyhow::{Context, Result};
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Fixed mount point of the workspace inside the toolkit container
pub const CONTAINER_WORKSPACE: &str = "/github/workspace";

/// Label carrying the host workspace on every container we create
pub const WORKSPACE_LABEL: &str = "toolkit-runner.workspace";

/// Exit status recorded when the container could not be run at all
/// (same code `docker run` uses when the daemon itself fails)
pub const INVOCATION_FAILURE_EXIT_CODE: i64 = 125;

/// Executes the toolkit action for one test case
#[allow(async_fn_in_trait)]
pub trait ActionEngine {
    /// Run the action with `workspace` mounted at [`CONTAINER_WORKSPACE`],
    /// blocking until it exits. Returns the container exit status.
    async fn invoke(&self, workspace: &Path, inputs: &BTreeMap<String, String>) -> Result<i64>;
}

/// GitHub Actions input variable name: `postbuild_command` → `INPUT_POSTBUILD_COMMAND`
pub fn input_env_name(name: &str) -> String {
    format!("INPUT_{}", name.trim().replace(' ', "_").to_uppercase())
}

/// Full container environment for a set of inputs
pub fn container_env(inputs: &BTreeMap<String, String>) -> Vec<String> {
    let mut env = vec![format!("GITHUB_WORKSPACE={}", CONTAINER_WORKSPACE)];
    env.extend(
        inputs
            .iter()
            .map(|(name, value)| format!("{}={}", input_env_name(name), value)),
    );
    env
}

/// Container cleanup guard - removes the container if the invocation future
/// is dropped before the explicit removal ran
struct ContainerGuard<'a> {
    docker: &'a Docker,
    container_id: Option<String>,
}

impl<'a> ContainerGuard<'a> {
    fn new(docker: &'a Docker, container_id: String) -> Self {
        Self {
            docker,
            container_id: Some(container_id),
        }
    }

    fn disarm(&mut self) {
        self.container_id = None;
    }
}

impl<'a> Drop for ContainerGuard<'a> {
    fn drop(&mut self) {
        // Best-effort cleanup - cannot be async in Drop
        let Some(container_id) = self.container_id.take() else {
            return;
        };
        let docker = self.docker.clone();

        tokio::spawn(async move {
            let remove_options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };

            if let Err(e) = docker.remove_container(&container_id, Some(remove_options)).await {
                warn!(container = %container_id, error = %e, "Failed to cleanup container");
            }
        });
    }
}

/// Docker API engine
///
/// **Invocation Rules:**
/// 1. Pulls the toolkit image if not present
/// 2. Creates a container with the workspace bind-mounted read-write
/// 3. Passes inputs as `INPUT_*` environment variables
/// 4. Streams container stdout/stderr to our own stdout/stderr
/// 5. Waits for the container to stop, without a timeout
/// 6. Removes the container
pub struct DockerEngine {
    docker: Docker,
    image: String,
    // Image default (the action entrypoint) unless overridden
    command: Option<Vec<String>>,
}

impl DockerEngine {
    pub fn new(image: impl Into<String>) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon")?;

        Ok(DockerEngine {
            docker,
            image: image.into(),
            command: None,
        })
    }

    #[cfg(test)]
    fn with_command<const N: usize>(mut self, command: [&str; N]) -> Self {
        self.command = Some(command.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Ensure the toolkit image is available (pull if needed)
    async fn ensure_image(&self) -> Result<()> {
        if self.docker.inspect_image(&self.image).await.is_ok() {
            debug!(image = %self.image, "Image cache hit");
            return Ok(());
        }

        warn!(image = %self.image, "Image cache miss, pulling");

        let options = Some(CreateImageOptions {
            from_image: self.image.as_str(),
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            result.context("Failed to pull Docker image")?;
        }

        info!(image = %self.image, "Image pulled");
        Ok(())
    }

    /// Follow container logs until the container closes its streams
    async fn stream_logs(&self, container_id: &str) {
        let logs_options = Some(LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: true,
            ..Default::default()
        });

        let mut logs_stream = self.docker.logs(container_id, logs_options);
        while let Some(output) = logs_stream.next().await {
            let written = match output {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                    let mut out = std::io::stdout().lock();
                    out.write_all(&message).and_then(|_| out.flush())
                }
                Ok(LogOutput::StdErr { message }) => {
                    let mut err = std::io::stderr().lock();
                    err.write_all(&message).and_then(|_| err.flush())
                }
                Ok(_) => Ok(()),
                Err(e) => {
                    warn!(error = %e, "Error reading container logs");
                    break;
                }
            };
            if let Err(e) = written {
                warn!(error = %e, "Failed to forward container output");
            }
        }
    }

    /// Start the container, forward its output and wait for it to stop
    async fn run_container(&self, container_id: &str) -> Result<i64> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .context("Failed to start Docker container")?;

        self.stream_logs(container_id).await;
        self.wait_exit_code(container_id).await
    }

    async fn remove_container(&self, container_id: &str, container_name: &str) {
        let remove_options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self
            .docker
            .remove_container(container_id, Some(remove_options))
            .await
        {
            warn!(container = %container_name, error = %e, "Failed to remove container");
        }
    }

    /// Block until the container stops and return its status code
    async fn wait_exit_code(&self, container_id: &str) -> Result<i64> {
        let wait_options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut wait_stream = self.docker.wait_container(container_id, Some(wait_options));
        match wait_stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e).context("Failed to wait for container"),
            None => anyhow::bail!("No wait response from container {}", container_id),
        }
    }
}

impl ActionEngine for DockerEngine {
    async fn invoke(&self, workspace: &Path, inputs: &BTreeMap<String, String>) -> Result<i64> {
        self.ensure_image()
            .await
            .with_context(|| format!("Failed to ensure Docker image '{}' is available", self.image))?;

        let container_name = format!("toolkit-{}", uuid::Uuid::new_v4());
        let bind = format!("{}:{}", workspace.display(), CONTAINER_WORKSPACE);

        let config = Config {
            image: Some(self.image.clone()),
            env: Some(container_env(inputs)),
            cmd: self.command.clone(),
            labels: Some(std::collections::HashMap::from([(
                WORKSPACE_LABEL.to_string(),
                workspace.display().to_string(),
            )])),
            working_dir: Some(CONTAINER_WORKSPACE.to_string()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(bollard::models::HostConfig {
                binds: Some(vec![bind]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        let container = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .context("Failed to create Docker container")?;

        let container_id = container.id;
        let mut guard = ContainerGuard::new(&self.docker, container_id.clone());

        info!(
            container = %container_name,
            image = %self.image,
            workspace = %workspace.display(),
            inputs = inputs.len(),
            "Starting toolkit container"
        );

        // Removal is awaited on every path; the guard only covers a dropped future
        let outcome = self.run_container(&container_id).await;
        self.remove_container(&container_id, &container_name).await;
        guard.disarm();

        let exit_code = outcome?;
        debug!(container = %container_name, exit_code, "Container exited");
        Ok(exit_code)
    }
}
