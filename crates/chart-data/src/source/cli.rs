//! CLI service invocation.

use std::process::Stdio;

use log::{debug, warn};
use tokio::process::Command;
use tokio::time::timeout;

use crate::errors::ChartDataError;
use crate::models::CliServiceConfig;

/// Longest stderr excerpt carried in a [`ChartDataError::CommandFailed`].
const STDERR_TAIL_CHARS: usize = 512;

/// Run a CLI service and capture its stdout.
///
/// The child is killed if the service exceeds its timeout or if the returned
/// future is dropped (for example when every caller waiting on it cancels).
///
/// # Errors
///
/// - [`ChartDataError::Timeout`] when the service runs past `timeout_seconds`
/// - [`ChartDataError::CommandFailed`] when it cannot be spawned or exits non-zero
pub async fn run_service(service: &CliServiceConfig) -> Result<Vec<u8>, ChartDataError> {
    let mut command = Command::new(service.command());
    command
        .args(service.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = service.working_dir() {
        command.current_dir(dir);
    }

    debug!(
        "Running CLI service '{}': {} {}",
        service.name(),
        service.command(),
        service.args().join(" ")
    );

    let output = match timeout(service.timeout(), command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("CLI service '{}' could not be started: {}", service.name(), e);
            return Err(ChartDataError::CommandFailed {
                service: service.name().to_string(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            });
        }
        Err(_) => {
            warn!(
                "CLI service '{}' timed out after {}s",
                service.name(),
                service.timeout_seconds()
            );
            return Err(ChartDataError::Timeout {
                service: service.name().to_string(),
                seconds: service.timeout_seconds(),
            });
        }
    };

    if !output.status.success() {
        let stderr = stderr_tail(&output.stderr);
        warn!(
            "CLI service '{}' exited with {}: {}",
            service.name(),
            output.status,
            stderr
        );
        return Err(ChartDataError::CommandFailed {
            service: service.name().to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    debug!(
        "CLI service '{}' produced {} bytes",
        service.name(),
        output.stdout.len()
    );
    Ok(output.stdout)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_end() {
        let long = "x".repeat(600) + "boom";
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS);
        assert!(tail.ends_with("boom"));
    }

    #[test]
    fn test_stderr_tail_trims_short_output() {
        assert_eq!(stderr_tail(b"  failed\n"), "failed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_service_captures_stdout() {
        let service = CliServiceConfig::new(
            "echo",
            "sh",
            vec!["-c".to_string(), "printf 'a,b\\n1,2\\n'".to_string()],
            5,
        )
        .unwrap();

        let stdout = run_service(&service).await.unwrap();
        assert_eq!(stdout, b"a,b\n1,2\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let service = CliServiceConfig::new(
            "failing",
            "sh",
            vec!["-c".to_string(), "echo nope >&2; exit 3".to_string()],
            5,
        )
        .unwrap();

        match run_service(&service).await {
            Err(ChartDataError::CommandFailed { status, stderr, .. }) => {
                assert!(status.contains('3'));
                assert_eq!(stderr, "nope");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_service_times_out() {
        let service =
            CliServiceConfig::new("slow", "sleep", vec!["5".to_string()], 1).unwrap();

        let result = run_service(&service).await;
        assert!(matches!(
            result,
            Err(ChartDataError::Timeout { seconds: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_command_failed() {
        let service =
            CliServiceConfig::new("ghost", "chartdeck-no-such-binary", Vec::new(), 5).unwrap();

        let result = run_service(&service).await;
        assert!(matches!(
            result,
            Err(ChartDataError::CommandFailed { .. })
        ));
    }
}
