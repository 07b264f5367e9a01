//! Hardhat task driver

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use generator_common::{Error, Result};
use generator_core::config::HardhatConfig;
use generator_core::contract::TokenArguments;

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// Runs hardhat tasks through a [`CommandRunner`]
pub struct Hardhat<R: CommandRunner> {
    runner: Arc<R>,
    config: HardhatConfig,
    working_dir: PathBuf,
}

impl<R: CommandRunner> Hardhat<R> {
    pub fn new(runner: Arc<R>, config: HardhatConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            config,
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn spec(&self, task_args: &[&str]) -> CommandSpec {
        let mut args = self.config.base_args.clone();
        args.extend(task_args.iter().map(|arg| arg.to_string()));
        CommandSpec::new(self.config.program.clone(), args)
            .working_dir(self.working_dir.clone())
            .timeout(Duration::from_secs(self.config.timeout_secs))
    }

    async fn run_task(&self, task: &str, task_args: &[&str]) -> Result<CommandOutput> {
        let spec = self.spec(task_args);
        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|e| Error::hardhat(task, e.to_string()))?;

        if !output.success() {
            let message = if output.stderr.trim().is_empty() {
                format!("'{}' exited with status {:?}", spec.display(), output.status)
            } else {
                output.stderr.trim().to_string()
            };
            return Err(Error::hardhat(task, message));
        }

        if !output.stderr.trim().is_empty() {
            warn!(task, stderr = %output.stderr.trim(), "hardhat reported warnings");
        }

        Ok(output)
    }

    /// Compile every contract in the project and return hardhat's stdout
    #[instrument(skip(self))]
    pub async fn compile(&self) -> Result<String> {
        let output = self.run_task("compile", &["compile"]).await?;
        info!("hardhat compile finished");
        Ok(output.stdout)
    }

    /// Verify a deployed contract on the explorer of `network`
    #[instrument(skip(self, args_path), fields(args = %args_path.display()))]
    pub async fn verify(&self, network: &str, address: &str, args_path: &Path) -> Result<String> {
        let args_path = args_path.to_string_lossy().into_owned();
        let output = self
            .run_task(
                "verify",
                &["verify", "--network", network, address, "--constructor-args", args_path.as_str()],
            )
            .await?;
        info!("hardhat verify finished");
        Ok(output.stdout)
    }
}

/// Render the constructor argument module consumed by `--constructor-args`
pub fn constructor_args_module(args: &TokenArguments) -> Result<String> {
    let body = serde_json::to_string_pretty(args)?;
    Ok(format!("module.exports = [{}];\n", body))
}

/// Write the constructor argument module to `path`, creating parent directories
pub async fn write_constructor_args(path: &Path, args: &TokenArguments) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, constructor_args_module(args)?).await?;
    Ok(())
}
