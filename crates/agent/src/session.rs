//! One non-interactive agent session: spawn the runtime, stream its stdout.
//!
//! The runtime is a child process speaking newline-delimited JSON. Each
//! line is parsed into `AgentMessage`s and turned into `SessionEvent`s,
//! which are forwarded over an mpsc channel as they arrive.

use crate::message::{CostSummary, SessionEvent, parse_line};
use crate::options::AgentOptions;
use dbclaw_config::AgentConfig;
use dbclaw_core::error::AgentError;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

pub struct AgentSession {
    program: String,
    base_args: Vec<String>,
    options: AgentOptions,
}

impl AgentSession {
    pub fn new(config: &AgentConfig, options: AgentOptions) -> Self {
        Self::with_program(config.command.clone(), config.args.clone(), options)
    }

    /// Use an explicit program and leading arguments instead of the
    /// configured runtime.
    pub fn with_program(program: impl Into<String>, base_args: Vec<String>, options: AgentOptions) -> Self {
        Self {
            program: program.into(),
            base_args,
            options,
        }
    }

    /// Full argument list passed to the program for `prompt`.
    pub fn command_line(&self, prompt: &str) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(self.options.to_args(prompt));
        args
    }

    /// Start a session and return its event stream.
    ///
    /// The stream ends after the runtime closes stdout. A non-zero exit
    /// without a result message is delivered as a final `ProcessFailed`.
    /// Dropping the receiver kills the child.
    pub fn query(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<SessionEvent, AgentError>>, AgentError> {
        let args = self.command_line(prompt);
        debug!(program = %self.program, "Spawning agent runtime");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Spawn {
                command: self.program.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Protocol("agent runtime stdout not captured".into()))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        tokio::spawn(async move {
            let stderr_task = tokio::spawn(async move {
                let mut buf = String::new();
                if let Some(mut stderr) = stderr {
                    let _ = stderr.read_to_string(&mut buf).await;
                }
                buf
            });

            let mut lines = BufReader::new(stdout).lines();
            let mut completed = false;

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let message = match parse_line(&line) {
                            Ok(m) => m,
                            Err(e) => {
                                debug!(error = %e, "Skipping unparseable runtime output line");
                                continue;
                            }
                        };
                        for event in message.into_events() {
                            if matches!(event, SessionEvent::Completed(_)) {
                                completed = true;
                            }
                            if tx.send(Ok(event)).await.is_err() {
                                // Receiver gone; the child is killed on drop.
                                return;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx
                            .send(Err(AgentError::Protocol(format!(
                                "reading runtime output: {e}"
                            ))))
                            .await;
                        return;
                    }
                }
            }

            let status = child.wait().await;
            let stderr = stderr_task.await.unwrap_or_default();

            match status {
                Ok(status) if !status.success() && !completed => {
                    warn!(code = ?status.code(), "Agent runtime failed");
                    let _ = tx
                        .send(Err(AgentError::ProcessFailed {
                            code: status.code(),
                            stderr: stderr.trim().to_string(),
                        }))
                        .await;
                }
                Ok(status) => {
                    if !completed {
                        warn!("Agent runtime exited without a result message");
                    }
                    debug!(code = ?status.code(), "Agent runtime exited");
                }
                Err(e) => {
                    let _ = tx
                        .send(Err(AgentError::Protocol(format!(
                            "waiting for runtime: {e}"
                        ))))
                        .await;
                }
            }
        });

        Ok(rx)
    }

    /// Run a session to completion, handing each event to `on_event`.
    ///
    /// Returns the cost summary if the runtime produced a result message.
    pub async fn run<F>(&self, prompt: &str, mut on_event: F) -> Result<Option<CostSummary>, AgentError>
    where
        F: FnMut(&SessionEvent),
    {
        let mut rx = self.query(prompt)?;
        let mut summary = None;

        while let Some(event) = rx.recv().await {
            let event = event?;
            on_event(&event);
            if let SessionEvent::Completed(s) = event {
                summary = Some(s);
            }
        }

        if let Some(s) = &summary {
            info!(
                cost_usd = ?s.total_cost_usd,
                turns = ?s.num_turns,
                is_error = s.is_error,
                "Agent session finished"
            );
        }
        Ok(summary)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn session(script: &str) -> AgentSession {
        let options =
            AgentOptions::from_config(&AgentConfig::default(), "mongodb://localhost").unwrap();
        AgentSession::with_program(
            "sh",
            vec!["-c".into(), script.into(), "agent".into()],
            options,
        )
    }

    #[tokio::test]
    async fn streams_text_then_cost() {
        let script = r#"
printf '%s\n' '{"type":"system","subtype":"init"}'
printf '%s\n' '{"type":"assistant","message":{"content":[{"type":"text","text":"hub_stats_models"}]}}'
printf '%s\n' '{"type":"result","subtype":"success","total_cost_usd":0.25,"num_turns":2,"is_error":false}'
"#;
        let mut texts = Vec::new();
        let summary = session(script)
            .run("list", |e| {
                if let SessionEvent::Text { text } = e {
                    texts.push(text.clone());
                }
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(texts, vec!["hub_stats_models"]);
        assert_eq!(summary.billable(), Some(0.25));
        assert_eq!(summary.num_turns, Some(2));
    }

    #[tokio::test]
    async fn prompt_reaches_the_runtime_last() {
        let script = r#"
for a in "$@"; do last="$a"; done
printf '{"type":"assistant","message":{"content":[{"type":"text","text":"%s"}]}}\n' "$last"
"#;
        let mut seen = None;
        session(script)
            .run("ping", |e| {
                if let SessionEvent::Text { text } = e {
                    seen = Some(text.clone());
                }
            })
            .await
            .unwrap();
        assert_eq!(seen.as_deref(), Some("ping"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_process_failed() {
        let result = session("echo boom >&2; exit 3").run("x", |_| {}).await;
        match result {
            Err(AgentError::ProcessFailed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_lines_are_skipped() {
        let script = r#"
echo 'not json at all'
printf '%s\n' '{"type":"result","total_cost_usd":0}'
"#;
        let mut events = 0;
        let summary = session(script).run("x", |_| events += 1).await.unwrap();
        assert_eq!(events, 1);
        assert_eq!(summary.unwrap().billable(), None);
    }

    #[tokio::test]
    async fn clean_exit_without_result_yields_none() {
        let summary = session("true").run("x", |_| {}).await.unwrap();
        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let options =
            AgentOptions::from_config(&AgentConfig::default(), "mongodb://localhost").unwrap();
        let session = AgentSession::with_program("/nonexistent/dbclaw-runtime", vec![], options);
        assert!(matches!(
            session.run("x", |_| {}).await,
            Err(AgentError::Spawn { .. })
        ));
    }

    #[test]
    fn command_line_prepends_base_args() {
        let args = session("true").command_line("q");
        assert_eq!(args[0], "-c");
        assert_eq!(args[2], "agent");
        assert_eq!(args.last().map(String::as_str), Some("q"));
    }
}
