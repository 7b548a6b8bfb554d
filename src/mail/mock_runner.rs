//! In-memory [`ScriptRunner`] for tests.
//!
//! Records every invocation and answers with canned output per script name,
//! so the tool layer can be exercised without macOS or Mail.app.

use std::collections::HashMap;
use std::sync::Mutex;

use super::runner::{ScriptError, ScriptRunner};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Script name as passed to the runner.
    pub script: String,
    /// Positional arguments as passed to the runner.
    pub args: Vec<String>,
}

/// A script runner that returns configured responses.
///
/// Scripts without a configured response fail with a [`ScriptError`].
#[derive(Default)]
pub struct MockScriptRunner {
    responses: Mutex<HashMap<String, Result<String, ScriptError>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockScriptRunner {
    /// Create a runner with no configured responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `script` with `output`.
    pub fn with_output(self, script: &str, output: &str) -> Self {
        self.set_response(script, Ok(output.to_owned()));
        self
    }

    /// Fail every call to `script` with `error`.
    pub fn with_error(self, script: &str, error: ScriptError) -> Self {
        self.set_response(script, Err(error));
        self
    }

    /// Replace the response for `script`.
    pub fn set_response(&self, script: &str, response: Result<String, ScriptError>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(script.to_owned(), response);
        }
    }

    /// All invocations so far, oldest first.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The most recent invocation, if any.
    pub fn last_call(&self) -> Option<Invocation> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }
}

impl ScriptRunner for MockScriptRunner {
    fn run(&self, script: &str, args: &[String]) -> Result<String, ScriptError> {
        self.calls
            .lock()
            .map_err(|_| ScriptError::message_only("mock lock poisoned"))?
            .push(Invocation {
                script: script.to_owned(),
                args: args.to_vec(),
            });

        let responses = self
            .responses
            .lock()
            .map_err(|_| ScriptError::message_only("mock lock poisoned"))?;
        responses.get(script).cloned().unwrap_or_else(|| {
            Err(ScriptError::message_only(format!(
                "no response configured for {script}"
            )))
        })
    }
}
