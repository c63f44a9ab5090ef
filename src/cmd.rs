use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub async fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    debug!(command = %format_command(program, args), "exec");
    let output = spawn(program, args).await?;
    into_stdout(program, args, &output)
}

/// Run a command with stdout/stderr inherited so progress output
/// reaches the CI log directly.
pub async fn run_interactive(program: &str, args: &[&str]) -> DeployResult<()> {
    debug!(command = %format_command(program, args), "exec");
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| not_found_or_io(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status,
            output: String::new(),
        })
    }
}

/// Run a command that pipes its stdin from a byte slice.
pub async fn run_with_stdin(
    program: &str,
    args: &[&str],
    stdin_data: &[u8],
) -> DeployResult<String> {
    debug!(command = %format_command(program, args), "exec with stdin");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found_or_io(program, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(stdin_data).await?;
    }

    let output = child.wait_with_output().await?;
    into_stdout(program, args, &output)
}

/// Check if a command exists on PATH.
pub async fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|s| s.success())
}

async fn spawn(program: &str, args: &[&str]) -> DeployResult<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| not_found_or_io(program, e))
}

fn into_stdout(program: &str, args: &[&str], output: &Output) -> DeployResult<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = format_command(program, args);
        warn!(%command, %stderr, "command failed");
        Err(DeployError::CommandFailed {
            command,
            status: output.status,
            output: if stderr.is_empty() { stdout } else { stderr },
        })
    }
}

fn not_found_or_io(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

/// Render a command line for logs and error messages. Values of
/// `config:set` pairs and `--password` arguments are masked.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            parts.push("***".to_string());
            mask_next = false;
            continue;
        }
        if *arg == "--password" {
            mask_next = true;
        }
        match arg.split_once('=') {
            Some((key, _)) if is_env_key(key) => parts.push(format!("{key}=***")),
            _ => parts.push((*arg).to_string()),
        }
    }
    parts.join(" ")
}

fn is_env_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_config_values() {
        let rendered = format_command(
            "heroku",
            &["config:set", "HASURA_JWT_SECRET=abc", "--app", "runn-pr-1-app"],
        );
        assert_eq!(
            rendered,
            "heroku config:set HASURA_JWT_SECRET=*** --app runn-pr-1-app"
        );
    }

    #[test]
    fn masks_password_argument() {
        let rendered = format_command("docker", &["login", "--password", "hunter2"]);
        assert_eq!(rendered, "docker login --password ***");
    }

    #[test]
    fn keeps_scale_arguments() {
        let rendered = format_command("heroku", &["ps:scale", "web=1", "--app", "x"]);
        assert_eq!(rendered, "heroku ps:scale web=1 --app x");
    }
}
