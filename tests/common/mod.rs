//! Shared test harness: a shell double that records invocations.

use std::sync::{Arc, Mutex};

use sbatchreg::error::Result;
use sbatchreg::runner::Shell;

/// Shell double that records every command it is asked to execute and
/// returns a scripted exit code. Cloning shares the call log, so a test
/// can keep a handle after the registry takes ownership.
#[derive(Debug, Clone)]
pub struct RecordingShell {
    calls: Arc<Mutex<Vec<String>>>,
    exit_code: i32,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::with_exit_code(0)
    }

    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            exit_code,
        }
    }

    /// Commands executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Shell for RecordingShell {
    fn execute(&self, command: &str) -> Result<(Option<i32>, String)> {
        self.calls.lock().unwrap().push(command.to_string());
        Ok((Some(self.exit_code), format!("ran: {command}\n")))
    }
}
