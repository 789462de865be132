//! One-shot result delivery
//!
//! Each command carries at most one [`ResultCallback`]. Firing consumes it,
//! so a second report cannot be written. Dropping one that never fired is a
//! bug in the controller and is flagged at runtime.

use crossbeam_channel::{Receiver, bounded};
use serde::Serialize;
use tracing::error;

/// Outcome code reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ResultCode {
    Failure = 0,
    Success = 1,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Failure payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// A `(code, payload)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub code: ResultCode,
    pub payload: Option<ErrorPayload>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            code: ResultCode::Success,
            payload: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            code: ResultCode::Failure,
            payload: Some(ErrorPayload {
                error: error.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Success
    }

    /// Failure message, if any
    pub fn error(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.error.as_str())
    }

    /// Payload as JSON: `null` on success, `{"error": ...}` on failure
    pub fn payload_json(&self) -> String {
        match &self.payload {
            Some(payload) => serde_json::json!({ "error": payload.error }).to_string(),
            None => serde_json::Value::Null.to_string(),
        }
    }
}

type Sink = Box<dyn FnOnce(CommandResult) + Send>;

/// Single-use result sink
pub struct ResultCallback {
    sink: Option<Sink>,
}

impl ResultCallback {
    /// Wrap a closure
    pub fn new(sink: impl FnOnce(CommandResult) + Send + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
        }
    }

    /// Callback delivering into a channel, plus the receiving end
    pub fn channel() -> (Self, Receiver<CommandResult>) {
        let (tx, rx) = bounded(1);
        let callback = Self::new(move |result| {
            // Receiver may have gone away; nothing to deliver to
            let _ = tx.send(result);
        });
        (callback, rx)
    }

    /// Deliver the result
    pub fn send(mut self, result: CommandResult) {
        if let Some(sink) = self.sink.take() {
            sink(result);
        }
    }

    /// Drop without reporting. Only for commands that never report.
    pub fn discard(mut self) {
        self.sink = None;
    }
}

impl std::fmt::Debug for ResultCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCallback")
            .field("fired", &self.sink.is_none())
            .finish()
    }
}

impl Drop for ResultCallback {
    fn drop(&mut self) {
        if self.sink.is_some() && !std::thread::panicking() {
            error!("Result callback dropped without a report");
            debug_assert!(false, "result callback dropped without a report");
        }
    }
}

/// Report through an optional callback
pub(crate) fn report(callback: Option<ResultCallback>, result: CommandResult) {
    if let Some(callback) = callback {
        callback.send(result);
    }
}
