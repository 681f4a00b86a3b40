//! pulumi CLI engine
//!
//! Drives the `pulumi` CLI against a local project directory. Long-running
//! operations (refresh, up, destroy) stream their progress to the terminal.

use crate::engine::{DestroyOptions, Outputs, ProvisioningEngine, Result, StackHandle, UpOptions};
use crate::error::EngineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// pulumi CLI wrapper
#[derive(Debug, Clone)]
pub struct PulumiCli {
    binary: String,
}

impl PulumiCli {
    pub fn new() -> Self {
        Self {
            binary: "pulumi".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .arg("--non-interactive")
            .current_dir(dir)
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(Stdio::null());
        cmd
    }

    /// Run a pulumi command and return stdout
    async fn run_command(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let mut cmd = self.command(dir, args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let output = cmd.output().await.map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(args, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a pulumi command with output going to the terminal
    async fn run_streaming(&self, dir: &Path, args: &[&str]) -> Result<()> {
        let mut cmd = self.command(dir, args);
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let status = cmd.status().await.map_err(spawn_error)?;
        if !status.success() {
            return Err(EngineError::CommandFailed {
                command: command_name(args),
                message: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}

impl Default for PulumiCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningEngine for PulumiCli {
    async fn upsert(&self, fqsn: &str, path: &Path) -> Result<Box<dyn StackHandle>> {
        self.run_command(path, &["stack", "select", "--create", fqsn])
            .await?;
        Ok(Box::new(PulumiStack {
            cli: self.clone(),
            fqsn: fqsn.to_string(),
            path: path.to_path_buf(),
        }))
    }

    async fn remove_stack(&self, fqsn: &str, path: &Path, force: bool) -> Result<()> {
        let mut args = vec!["stack", "rm", "--yes"];
        if force {
            args.push("--force");
        }
        args.push(fqsn);
        self.run_command(path, &args).await?;
        Ok(())
    }
}

/// A stack selected through the CLI
pub struct PulumiStack {
    cli: PulumiCli,
    fqsn: String,
    path: PathBuf,
}

#[async_trait]
impl StackHandle for PulumiStack {
    fn fqsn(&self) -> &str {
        &self.fqsn
    }

    async fn refresh(&self) -> Result<()> {
        self.cli
            .run_streaming(
                &self.path,
                &["refresh", "--yes", "--skip-preview", "--stack", &self.fqsn],
            )
            .await
    }

    async fn up(&self, opts: &UpOptions) -> Result<Outputs> {
        let parallel = opts.parallel.to_string();
        self.cli
            .run_streaming(
                &self.path,
                &[
                    "up",
                    "--yes",
                    "--skip-preview",
                    "--parallel",
                    &parallel,
                    "--color",
                    &opts.color,
                    "--stack",
                    &self.fqsn,
                ],
            )
            .await?;
        self.outputs().await
    }

    async fn destroy(&self, opts: &DestroyOptions) -> Result<()> {
        let parallel = opts.parallel.to_string();
        self.cli
            .run_streaming(
                &self.path,
                &[
                    "destroy",
                    "--yes",
                    "--skip-preview",
                    "--parallel",
                    &parallel,
                    "--color",
                    &opts.color,
                    "--stack",
                    &self.fqsn,
                ],
            )
            .await
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.cli
            .run_command(
                &self.path,
                &["config", "set", key, value, "--stack", &self.fqsn],
            )
            .await?;
        Ok(())
    }

    async fn get_config(&self, key: &str) -> Result<String> {
        let out = self
            .cli
            .run_command(&self.path, &["config", "get", key, "--stack", &self.fqsn])
            .await?;
        Ok(out.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn remove_config(&self, key: &str) -> Result<()> {
        self.cli
            .run_command(&self.path, &["config", "rm", key, "--stack", &self.fqsn])
            .await?;
        Ok(())
    }

    async fn outputs(&self) -> Result<Outputs> {
        let out = self
            .cli
            .run_command(
                &self.path,
                &[
                    "stack",
                    "output",
                    "--json",
                    "--show-secrets",
                    "--stack",
                    &self.fqsn,
                ],
            )
            .await?;
        if out.trim().is_empty() {
            return Ok(Outputs::new());
        }
        Ok(serde_json::from_str(&out)?)
    }
}

fn spawn_error(e: std::io::Error) -> EngineError {
    match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::CliNotFound,
        _ => EngineError::IoError(e),
    }
}

fn command_name(args: &[&str]) -> String {
    args.iter()
        .take_while(|a| !a.starts_with('-'))
        .take(2)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The CLI reports a missing config key only as text; convert it here.
fn classify_failure(args: &[&str], stderr: &str) -> EngineError {
    if let ["config", "get" | "rm", key, ..] = args
        && stderr.contains("not found")
    {
        return EngineError::ConfigNotFound(key.to_string());
    }
    EngineError::CommandFailed {
        command: command_name(args),
        message: stderr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_config_key() {
        let err = classify_failure(
            &["config", "get", "lkeId", "--stack", "acme/demo-infra/dev"],
            "error: configuration key 'lkeId' not found for stack 'dev'\n",
        );
        assert!(matches!(err, EngineError::ConfigNotFound(k) if k == "lkeId"));

        let err = classify_failure(
            &["config", "rm", "nodebalancer-id", "--stack", "acme/demo-infra/dev"],
            "error: configuration key 'nodebalancer-id' not found for stack 'dev'",
        );
        assert!(matches!(err, EngineError::ConfigNotFound(_)));
    }

    #[test]
    fn test_classify_other_failures() {
        let err = classify_failure(
            &["config", "get", "lkeId", "--stack", "acme/demo-infra/dev"],
            "error: PULUMI_ACCESS_TOKEN must be set for login during non-interactive CLI sessions",
        );
        assert!(matches!(err, EngineError::CommandFailed { ref command, .. } if command == "config get"));

        let err = classify_failure(&["stack", "select", "--create", "x"], "error: stack not found");
        assert!(matches!(err, EngineError::CommandFailed { ref command, .. } if command == "stack select"));
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name(&["up", "--yes"]), "up");
        assert_eq!(command_name(&["stack", "rm", "--yes", "x"]), "stack rm");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let cli = PulumiCli::with_binary("/nonexistent/pulumi-for-test");
        let dir = tempfile::tempdir().unwrap();
        let err = cli.upsert("acme/demo/dev", dir.path()).await.err().unwrap();
        assert!(matches!(err, EngineError::CliNotFound));
    }
}
