use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::download::download_task::{fetch, FetchOptions, FetchRequest, FetchResult};
use crate::download::error::FetchErrorKind;
use crate::download::scheduler::Scheduler;

/// Subcommand the worker program must understand
pub const WORKER_COMMAND: &str = "worker";

/// One child process per request. The child re-runs `program` with the
/// worker subcommand and prints its `FetchResult` as one JSON line.
#[derive(Debug, Clone)]
pub struct ProcessScheduler {
    program: PathBuf,
}

impl ProcessScheduler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Scheduler for ProcessScheduler {
    async fn execute(&self, requests: Vec<FetchRequest>, options: Arc<FetchOptions>) -> Vec<FetchResult> {
        let options = options.as_ref();
        let children = requests
            .into_iter()
            .map(|request| run_child(&self.program, request, options));

        join_all(children).await
    }
}

async fn run_child(program: &Path, request: FetchRequest, options: &FetchOptions) -> FetchResult {
    let identifier = request.into_identifier();

    let mut command = Command::new(program);
    command
        .arg(WORKER_COMMAND)
        .arg("--url")
        .arg(&identifier)
        .arg("--output-dir")
        .arg(&options.output_dir)
        .arg("--chunk-size")
        .arg(options.chunk_size.to_string())
        .arg("--user-agent")
        .arg(&options.user_agent)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let result = match command.output().await {
        Ok(output) if output.status.success() => decode_result(&identifier, &output.stdout)
            .unwrap_or_else(|message| FetchResult::failure(identifier, FetchErrorKind::WorkerFailed, message)),
        Ok(output) => FetchResult::failure(
            identifier,
            FetchErrorKind::WorkerFailed,
            format!("Worker process exited with {}", output.status),
        ),
        Err(err) => FetchResult::failure(
            identifier,
            FetchErrorKind::WorkerFailed,
            format!("Failed to start worker process {}: {}", program.display(), err),
        ),
    };

    result.log();
    result
}

/// Read the child's result from the last non-empty line of its stdout
fn decode_result(identifier: &str, stdout: &[u8]) -> Result<FetchResult, String> {
    let line = stdout
        .split(|byte| *byte == b'\n')
        .rev()
        .find(|line| !line.iter().all(u8::is_ascii_whitespace))
        .ok_or_else(|| "Worker process printed no result".to_string())?;

    let result: FetchResult = serde_json::from_slice(line)
        .map_err(|err| format!("Unreadable worker output: {}", err))?;

    if result.identifier() != identifier {
        return Err(format!("Worker answered for {} instead", result.identifier()));
    }

    Ok(result)
}

/// Child side: fetch one identifier and print the result for the parent
pub async fn run_worker(request: FetchRequest, options: &FetchOptions) -> Result<()> {
    let result = fetch(&Client::new(), request, options).await;
    let mut line = serde_json::to_vec(&result)?;
    line.push(b'\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&line).await?;
    stdout.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const ID: &str = "https://example.test/a.jpg";

    #[test]
    fn should_decode_last_line() {
        let result = FetchResult::Success {
            identifier: ID.to_string(),
            destination_path: PathBuf::from("images/a.jpg"),
            elapsed: Duration::from_millis(12),
            byte_count: 2048,
        };
        let mut stdout = b"noise\n".to_vec();
        stdout.extend(serde_json::to_vec(&result).unwrap());
        stdout.extend(b"\n\n");

        assert_eq!(decode_result(ID, &stdout), Ok(result));
    }

    #[test]
    fn should_reject_empty_output() {
        let err = decode_result(ID, b"\n  \n").unwrap_err();
        assert!(err.contains("no result"));
    }

    #[test]
    fn should_reject_garbage() {
        let err = decode_result(ID, b"{ not json").unwrap_err();
        assert!(err.contains("Unreadable worker output"));
    }

    #[test]
    fn should_reject_foreign_identifier() {
        let result = FetchResult::failure("https://example.test/b.jpg", FetchErrorKind::NetworkError, "refused");
        let stdout = serde_json::to_vec(&result).unwrap();

        assert!(decode_result(ID, &stdout).is_err());
    }

    #[tokio::test]
    async fn missing_program_is_worker_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = ProcessScheduler::new(dir.path().join("no-such-program"));
        assert_eq!(scheduler.program(), dir.path().join("no-such-program").as_path());
        let options = Arc::new(FetchOptions {
            output_dir: dir.path().to_path_buf(),
            chunk_size: crate::download::config::DEFAULT_CHUNK_SIZE,
            user_agent: "fetch-runner/test".to_string(),
        });

        let results = scheduler.execute(vec![FetchRequest::new(ID)], options).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].identifier(), ID);
        assert_eq!(results[0].error_kind(), Some(FetchErrorKind::WorkerFailed));
    }
}
