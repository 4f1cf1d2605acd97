//! Child-process engine speaking line-delimited JSON
//!
//! Protocol, one JSON document per line:
//!
//! ```text
//! child  -> {"status":"ready"}
//! parent -> {"id":1,"rows":[...]}
//! child  -> {"id":1,"values":[0.21,0.08,0.34,0.5,0.2,2.5,0.012]}
//! child  -> {"id":2,"error":"model did not converge"}
//! ```
//!
//! `null` inside `values` decodes as NaN. Replies carrying another request's
//! id are dropped, so a late answer to a timed-out request never satisfies
//! the next one. A request whose write was cut short leaves a partial line on
//! the child's stdin; the child is then discarded rather than reused.

use crate::config::EngineConfig;
use crate::engine::StatsEngine;
use crate::error::EngineError;
use crate::request::{AnalysisRequest, EffectRow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    rows: &'a [EffectRow],
}

#[derive(Deserialize)]
struct Greeting {
    status: String,
}

#[derive(Deserialize)]
struct Reply {
    id: u64,
    #[serde(default)]
    values: Option<Vec<Option<f64>>>,
    #[serde(default)]
    error: Option<String>,
}

struct Pipe {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Set while a request line is being written
    torn: bool,
}

impl Pipe {
    async fn next_line(&mut self) -> Result<String, EngineError> {
        self.stdout.next_line().await?.ok_or(EngineError::Closed)
    }
}

/// Long-lived engine child process
pub struct ProcessEngine {
    config: EngineConfig,
    pipe: Mutex<Option<Pipe>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngine")
            .field("program", &self.config.program)
            .field("args", &self.config.args)
            .finish_non_exhaustive()
    }
}

impl ProcessEngine {
    /// Engine for the configured program; nothing is spawned until `boot`
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            pipe: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Process settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Kill the child, if running
    pub async fn shutdown(&self) {
        if let Some(mut pipe) = self.pipe.lock().await.take() {
            if let Err(e) = pipe.child.kill().await {
                tracing::warn!(error = %e, "failed to kill engine process");
            }
            tracing::debug!(program = %self.config.program, "engine process stopped");
        }
    }

    fn spawn(&self) -> Result<Pipe, EngineError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::protocol("child stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::protocol("child stdout not captured"))?;

        Ok(Pipe {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            torn: false,
        })
    }
}

#[async_trait]
impl StatsEngine for ProcessEngine {
    async fn boot(&self) -> Result<(), EngineError> {
        let mut guard = self.pipe.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut pipe = self.spawn()?;
        tracing::debug!(program = %self.config.program, "engine process spawned");
        loop {
            let line = pipe.next_line().await?;
            match serde_json::from_str::<Greeting>(&line) {
                Ok(greeting) if greeting.status == "ready" => break,
                Ok(greeting) => {
                    return Err(EngineError::protocol(format!(
                        "unexpected status '{}' during boot",
                        greeting.status
                    )))
                }
                Err(_) => tracing::debug!(line = %line, "engine startup output"),
            }
        }

        *guard = Some(pipe);
        tracing::info!(program = %self.config.program, "engine ready");
        Ok(())
    }

    async fn evaluate(&self, request: &AnalysisRequest) -> Result<Vec<f64>, EngineError> {
        let mut guard = self.pipe.lock().await;
        if guard.as_ref().is_some_and(|pipe| pipe.torn) {
            tracing::warn!(program = %self.config.program, "previous request interrupted mid-write");
            if let Some(mut pipe) = guard.take() {
                if let Err(e) = pipe.child.start_kill() {
                    tracing::warn!(error = %e, "failed to kill engine process");
                }
            }
            return Err(EngineError::Closed);
        }
        let pipe = guard
            .as_mut()
            .ok_or_else(|| EngineError::protocol("engine not booted"))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Envelope {
            id,
            rows: &request.rows,
        })
        .map_err(|e| EngineError::protocol(e.to_string()))?;
        line.push('\n');
        pipe.torn = true;
        pipe.stdin.write_all(line.as_bytes()).await?;
        pipe.stdin.flush().await?;
        pipe.torn = false;
        tracing::debug!(id, rows = request.len(), "request sent");

        let outcome = loop {
            let text = match pipe.next_line().await {
                Ok(text) => text,
                Err(e) => break Err(e),
            };
            let reply: Reply = match serde_json::from_str(&text) {
                Ok(reply) => reply,
                Err(e) => break Err(EngineError::protocol(format!("bad reply: {e}"))),
            };
            if reply.id != id {
                tracing::debug!(expected = id, got = reply.id, "discarding superseded reply");
                continue;
            }
            break match (reply.values, reply.error) {
                (_, Some(message)) => Err(EngineError::Failed(message)),
                (Some(values), None) => Ok(values
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect()),
                (None, None) => Err(EngineError::protocol("reply has neither values nor error")),
            };
        };

        if matches!(outcome, Err(EngineError::Closed | EngineError::Io(_))) {
            tracing::warn!(program = %self.config.program, "engine pipe lost");
            *guard = None;
        }
        outcome
    }
}
