//! The `scorecard` command line tool as a [`ScoreCheck`].

use super::ScoreCheck;
use crate::context::RunContext;
use crate::error::{Result, TallyError};
use crate::scorecard::ScoreRow;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Binary looked up on `PATH` when none is configured.
pub const DEFAULT_SCORECARD_BINARY: &str = "scorecard";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs `scorecard --repo=<repo> --format=json` and reads the aggregate
/// score. The child inherits the environment, so `GITHUB_TOKEN` reaches it.
#[derive(Debug, Clone)]
pub struct ScorecardCli {
    binary: PathBuf,
    extra_args: Vec<String>,
}

impl Default for ScorecardCli {
    fn default() -> Self {
        Self::new(DEFAULT_SCORECARD_BINARY)
    }
}

/// The parts of scorecard's JSON report we use.
#[derive(Debug, Deserialize)]
struct ScorecardReport {
    date: String,
    score: f64,
}

impl ScorecardCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    /// Extra arguments appended after the defaults (e.g. `--checks=...`).
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    fn command(&self, repository: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(format!("--repo={repository}"))
            .arg("--format=json")
            .arg("--show-details=false")
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Wait for the child, killing it if the context is cancelled first.
    /// The child is reaped on every path out of here.
    fn wait(ctx: &RunContext, child: &mut Child) -> Result<ExitStatus> {
        loop {
            if ctx.is_done() {
                stop(child);
                return Err(TallyError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    stop(child);
                    return Err(e.into());
                }
            }
        }
    }
}

fn stop(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("Failed to kill scorecard process: {}", e);
    }
    let _ = child.wait();
}

impl ScoreCheck for ScorecardCli {
    fn check(&self, ctx: &RunContext, repository: &str) -> Result<ScoreRow> {
        ctx.check()?;
        let failed = |message: String| TallyError::Generation {
            repository: repository.to_string(),
            message,
        };

        let mut child = self.command(repository).spawn().map_err(|e| {
            failed(format!(
                "failed to start {}: {e}",
                self.binary.display()
            ))
        })?;

        // Both pipes are drained while polling; a full pipe would stall the child.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // The pipes close once the child is gone, so the joins return either way.
        let status = Self::wait(ctx, &mut child);
        let stdout = join(stdout);
        let stderr = join(stderr);
        let status = status?;

        if !status.success() {
            let detail = stderr.trim();
            return Err(failed(if detail.is_empty() {
                format!("scorecard exited with {status}")
            } else {
                format!("scorecard exited with {status}: {detail}")
            }));
        }

        let (score, date) = parse_report(&stdout).map_err(failed)?;
        Ok(ScoreRow::new(repository, score, date))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Extract the aggregate score and the scan date from scorecard's JSON
/// report. The date is either `YYYY-MM-DD` or an RFC 3339 timestamp.
fn parse_report(output: &str) -> std::result::Result<(f64, NaiveDate), String> {
    let report: ScorecardReport = serde_json::from_str(output.trim())
        .map_err(|e| format!("unreadable scorecard output: {e}"))?;

    if !report.score.is_finite() || report.score < 0.0 {
        return Err(format!("scorecard reported no aggregate score ({})", report.score));
    }

    let date = NaiveDate::parse_from_str(&report.date, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&report.date).map(|d| d.date_naive()))
        .map_err(|e| format!("unreadable scorecard date '{}': {e}", report.date))?;

    Ok((report.score, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_with_timestamp() {
        let output = r#"{"date":"2024-03-05T10:11:12Z","repo":{"name":"github.com/a/b"},"score":6.7,"checks":[]}"#;
        let (score, date) = parse_report(output).unwrap();
        assert!((score - 6.7).abs() < f64::EPSILON);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_parse_report_with_plain_date() {
        let (_, date) = parse_report(r#"{"date":"2023-12-31","score":4}"#).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_report_rejects_missing_score() {
        assert!(parse_report(r#"{"date":"2023-12-31","score":-1}"#).is_err());
        assert!(parse_report(r#"{"date":"2023-12-31"}"#).is_err());
        assert!(parse_report("not json").is_err());
        assert!(parse_report(r#"{"date":"yesterday","score":3}"#).is_err());
    }

    #[test]
    fn test_command_arguments() {
        let cli = ScorecardCli::new("/opt/scorecard").with_args(["--checks=Maintained".to_string()]);
        let cmd = cli.command("github.com/a/b");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "--repo=github.com/a/b",
                "--format=json",
                "--show-details=false",
                "--checks=Maintained"
            ]
        );
        assert_eq!(cmd.get_program(), "/opt/scorecard");
    }

    #[test]
    fn test_missing_binary_is_generation_error() {
        let cli = ScorecardCli::new("/nonexistent/scorecard-binary");
        let err = cli.check(&RunContext::new(), "github.com/a/b").unwrap_err();
        match err {
            TallyError::Generation { repository, message } => {
                assert_eq!(repository, "github.com/a/b");
                assert!(message.contains("failed to start"), "{message}");
            }
            other => panic!("expected Generation error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_wait_reaps_child() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = drain(child.stdout.take());
        let ctx = RunContext::new();
        ctx.cancel();

        let err = ScorecardCli::wait(&ctx, &mut child).unwrap_err();
        assert!(matches!(err, TallyError::Cancelled));
        assert!(child.try_wait().unwrap().is_some());
        assert_eq!(join(stdout), "");
    }

    #[test]
    fn test_cancelled_context_skips_spawn() {
        let ctx = RunContext::new();
        ctx.cancel();
        let err = ScorecardCli::default().check(&ctx, "github.com/a/b").unwrap_err();
        assert!(matches!(err, TallyError::Cancelled));
    }
}
