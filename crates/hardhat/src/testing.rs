//! Scripted [`CommandRunner`] for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use generator_common::{Error, Result};

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// Replays queued outputs and records every command it was asked to run.
///
/// When the script is exhausted each call succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: Mutex<VecDeque<Result<CommandOutput>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful exit with `stdout`
    pub fn push_success(&self, stdout: &str) -> &Self {
        self.push(Ok(CommandOutput {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }))
    }

    /// Queue an exit with `status` and `stderr`
    pub fn push_exit(&self, status: i32, stderr: &str) -> &Self {
        self.push(Ok(CommandOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }))
    }

    /// Queue a runner failure such as a timeout
    pub fn push_error(&self, message: &str) -> &Self {
        self.push(Err(Error::generic(message)))
    }

    pub fn push(&self, outcome: Result<CommandOutput>) -> &Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Commands received so far
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spec.clone());
        }
        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        next.unwrap_or_else(|| {
            Ok(CommandOutput {
                status: Some(0),
                ..Default::default()
            })
        })
    }
}
