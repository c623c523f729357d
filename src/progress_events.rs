//! JSON-lines progress events on stdout, for hosts that drive the binary.
//!
//! Event format:
//! - Start: {"event":"started","operationId":"<uuid>","status":"running"}
//! - Progress: {"event":"progress","operationId":"<uuid>","percentComplete":<0-100>,"status":"running","message":"..."}
//! - Complete: {"event":"complete","operationId":"<uuid>","success":true/false,"status":"completed/failed","message":"..."}

use serde::Serialize;
use uuid::Uuid;

pub struct ProgressReporter {
    operation_id: String,
    enabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartEvent<'a> {
    event: &'static str,
    operation_id: &'a str,
    status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressEvent<'a> {
    event: &'static str,
    operation_id: &'a str,
    percent_complete: f64,
    status: &'static str,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteEvent<'a> {
    event: &'static str,
    operation_id: &'a str,
    success: bool,
    status: &'static str,
    message: &'a str,
}

impl ProgressReporter {
    /// `enabled` mirrors the --progress flag; a disabled reporter prints nothing
    pub fn new(enabled: bool) -> Self {
        Self {
            operation_id: Uuid::new_v4().to_string(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit_started(&self) {
        self.emit(&StartEvent {
            event: "started",
            operation_id: &self.operation_id,
            status: "running",
        });
    }

    pub fn emit_progress(&self, percent_complete: f64, message: &str) {
        self.emit(&ProgressEvent {
            event: "progress",
            operation_id: &self.operation_id,
            percent_complete: percent_complete.clamp(0.0, 100.0),
            status: "running",
            message,
        });
    }

    pub fn emit_complete(&self, message: &str) {
        self.emit(&CompleteEvent {
            event: "complete",
            operation_id: &self.operation_id,
            success: true,
            status: "completed",
            message,
        });
    }

    pub fn emit_failed(&self, message: &str) {
        self.emit(&CompleteEvent {
            event: "complete",
            operation_id: &self.operation_id,
            success: false,
            status: "failed",
            message,
        });
    }

    fn emit<T: Serialize>(&self, event: &T) {
        if !self.enabled {
            return;
        }
        if let Ok(json) = serde_json::to_string(event) {
            println!("{}", json);
        }
    }
}
